use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use nshide_common::constants::{HANDOFF_DAEMON_EXITING, HANDOFF_OK};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{HandoffRequest, HideEndpoint};
use crate::platform::ProcessControl;

/// The namespace mutation applied to a frozen target. An `Err` means the daemon can no
/// longer do its job and must exit.
#[async_trait]
pub trait HideAction: Send + Sync {
    async fn hide(&self, pid: i32) -> Result<()>;
}

/// Resumes targets without touching them.
#[derive(Clone, Debug, Default)]
pub struct NoopHideAction;

#[async_trait]
impl HideAction for NoopHideAction {
    async fn hide(&self, pid: i32) -> Result<()> {
        debug!("hide daemon: no hide command configured, resuming {}", pid);
        Ok(())
    }
}

/// Runs an external helper with the target pid as its last argument.
#[derive(Clone, Debug)]
pub struct CommandHideAction {
    program: String,
    args: Vec<String>,
}

impl CommandHideAction {
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl HideAction for CommandHideAction {
    async fn hide(&self, pid: i32) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to run hide command {}", self.program))?;

        if !status.success() {
            warn!("hide command for pid {} exited with {}", pid, status);
        }
        Ok(())
    }
}

/// Either action, picked from configuration.
pub enum ConfiguredHideAction {
    Command(CommandHideAction),
    Noop(NoopHideAction),
}

impl ConfiguredHideAction {
    pub fn from_config(command: Option<&[String]>) -> Self {
        match command.and_then(CommandHideAction::from_command) {
            Some(action) => Self::Command(action),
            None => Self::Noop(NoopHideAction),
        }
    }
}

#[async_trait]
impl HideAction for ConfiguredHideAction {
    async fn hide(&self, pid: i32) -> Result<()> {
        match self {
            Self::Command(action) => action.hide(pid).await,
            Self::Noop(action) => action.hide(pid).await,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HideDaemonExit {
    /// Received the termination sentinel.
    Terminated,
    /// The monitor side closed.
    Disconnected,
    /// The hide action failed; the monitor was told to shut down.
    Failed,
}

pub struct HideDaemon<P, A> {
    endpoint: HideEndpoint,
    control: Arc<P>,
    action: A,
}

impl<P, A> HideDaemon<P, A>
where
    P: ProcessControl + 'static,
    A: HideAction + 'static,
{
    pub fn new(endpoint: HideEndpoint, control: Arc<P>, action: A) -> Self {
        Self {
            endpoint,
            control,
            action,
        }
    }

    pub fn spawn(self) -> JoinHandle<HideDaemonExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> HideDaemonExit {
        info!("hide daemon: started");
        let exit = loop {
            let pid = match self.endpoint.next_request().await {
                Ok(Some(HandoffRequest::Hide(pid))) => pid,
                Ok(Some(HandoffRequest::Terminate)) => break HideDaemonExit::Terminated,
                Ok(None) => break HideDaemonExit::Disconnected,
                Err(e) => {
                    error!("hide daemon: failed to read request: {}", e);
                    break HideDaemonExit::Disconnected;
                }
            };

            let result = self.action.hide(pid).await;

            // the target must never stay frozen, whatever the action did
            if let Err(e) = self.control.resume(pid) {
                debug!("hide daemon: could not resume {}: {}", pid, e);
            }

            match result {
                Ok(()) => {
                    if let Err(e) = self.endpoint.respond(HANDOFF_OK).await {
                        error!("hide daemon: failed to respond: {}", e);
                        break HideDaemonExit::Disconnected;
                    }
                }
                Err(e) => {
                    error!("hide daemon: hide failed for {}: {:#}", pid, e);
                    let _ = self.endpoint.respond(HANDOFF_DAEMON_EXITING).await;
                    break HideDaemonExit::Failed;
                }
            }
        };
        info!("hide daemon: exiting ({:?})", exit);
        exit
    }
}
