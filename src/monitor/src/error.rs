use std::io;
use std::time::Duration;

use nshide_common::namespace::NamespaceError;
use nshide_common::WatchListError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::ChannelError;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor cancelled")]
    Cancelled,
    #[error(transparent)]
    Namespace(NamespaceError),
    #[error("event source failed: {0}")]
    EventSource(#[source] io::Error),
    #[error("hide channel failed: {0}")]
    Channel(#[from] ChannelError),
    #[error("watch list unavailable: {0}")]
    WatchList(#[from] WatchListError),
    #[error("hide daemon did not answer for pid {pid} within {timeout:?}")]
    HandoffTimeout { pid: i32, timeout: Duration },
}

impl From<NamespaceError> for MonitorError {
    fn from(e: NamespaceError) -> Self {
        match e {
            NamespaceError::Cancelled => MonitorError::Cancelled,
            other => MonitorError::Namespace(other),
        }
    }
}

/// Why a monitor run ended. Every variant goes through the same teardown.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum ExitReason {
    Cancelled,
    EventSourceClosed,
    HideDaemonTerminated,
    Fatal(String),
}

impl From<MonitorError> for ExitReason {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::Cancelled => ExitReason::Cancelled,
            other => ExitReason::Fatal(other.to_string()),
        }
    }
}
