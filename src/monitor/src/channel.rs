//! Rendezvous channel between the monitor and the hide daemon.
//!
//! Each request is a native-endian `i32` pid, answered by exactly one native-endian `i32`
//! status before the next request may be written. `-1` asks the daemon to exit.

use std::io;

use nshide_common::constants::HANDOFF_TERMINATE;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("hide daemon disconnected")]
    Disconnected,
    #[error("hide channel I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandoffRequest {
    Hide(i32),
    Terminate,
}

fn map_read_error(e: io::Error) -> ChannelError {
    match e.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => {
            ChannelError::Disconnected
        }
        _ => ChannelError::Io(e),
    }
}

async fn read_i32(stream: &mut UnixStream) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await?;
    Ok(i32::from_ne_bytes(buf))
}

/// Creates a connected pair: the monitor's sending side and the hide daemon's side.
pub fn channel_pair() -> io::Result<(HideChannel, HideEndpoint)> {
    let (monitor, daemon) = UnixStream::pair()?;
    Ok((
        HideChannel {
            stream: monitor,
            terminated: false,
        },
        HideEndpoint { stream: daemon },
    ))
}

/// Monitor side. `request` takes `&mut self`, so a single owner can never have two requests
/// in flight.
#[derive(Debug)]
pub struct HideChannel {
    stream: UnixStream,
    terminated: bool,
}

impl HideChannel {
    pub async fn request(&mut self, pid: i32) -> Result<i32, ChannelError> {
        if self.terminated {
            return Err(ChannelError::Disconnected);
        }
        self.stream
            .write_all(&pid.to_ne_bytes())
            .await
            .map_err(map_read_error)?;
        read_i32(&mut self.stream).await.map_err(map_read_error)
    }

    /// Sends the termination sentinel and closes our write half. Calling it twice is a no-op.
    pub async fn terminate(&mut self) -> Result<(), ChannelError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;
        self.stream
            .write_all(&HANDOFF_TERMINATE.to_ne_bytes())
            .await
            .map_err(map_read_error)?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Hide daemon side.
#[derive(Debug)]
pub struct HideEndpoint {
    stream: UnixStream,
}

impl HideEndpoint {
    /// `Ok(None)` once the monitor has gone away.
    pub async fn next_request(&mut self) -> Result<Option<HandoffRequest>, ChannelError> {
        match read_i32(&mut self.stream).await {
            Ok(HANDOFF_TERMINATE) => Ok(Some(HandoffRequest::Terminate)),
            Ok(pid) => Ok(Some(HandoffRequest::Hide(pid))),
            Err(e) => match map_read_error(e) {
                ChannelError::Disconnected => Ok(None),
                other => Err(other),
            },
        }
    }

    pub async fn respond(&mut self, code: i32) -> Result<(), ChannelError> {
        self.stream
            .write_all(&code.to_ne_bytes())
            .await
            .map_err(map_read_error)
    }
}
