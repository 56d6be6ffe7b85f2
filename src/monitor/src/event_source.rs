use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// A stream of textual process-start records, one per line.
#[async_trait]
pub trait EventSource: Send {
    /// `Ok(None)` once the source has closed.
    async fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Stops the producer, waits for it and releases the output handle.
    async fn shutdown(&mut self);
}

#[async_trait]
impl<T: EventSource + ?Sized> EventSource for Box<T> {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line().await
    }

    async fn shutdown(&mut self) {
        (**self).shutdown().await
    }
}

/// Opens the event source once spawner discovery is done.
#[async_trait]
pub trait EventSourceLauncher: Send + Sync {
    type Source: EventSource + 'static;

    async fn launch(&self) -> io::Result<Self::Source>;
}

/// How long the event command gets to exit after SIGTERM before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(1);

/// Lines read from the stdout of an external command (`logcat` on Android).
pub struct CommandEventSource {
    child: Option<Child>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl CommandEventSource {
    /// Runs `clear_command` to completion (best effort), then spawns `command`.
    pub async fn spawn(command: &[String], clear_command: &[String]) -> io::Result<Self> {
        if let Some((program, args)) = clear_command.split_first() {
            match Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await
            {
                Ok(status) if !status.success() => {
                    warn!("event source clear command exited with {}", status)
                }
                Ok(_) => {}
                Err(e) => warn!("failed to run event source clear command: {}", e),
            }
        }

        let (program, args) = command.split_first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "event command is empty")
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "event command has no stdout"))?;

        info!(
            "event source started: {} (pid={:?})",
            command.join(" "),
            child.id()
        );

        Ok(Self {
            child: Some(child),
            lines: Some(BufReader::new(stdout).lines()),
        })
    }
}

#[async_trait]
impl EventSource for CommandEventSource {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.lines.as_mut() {
            Some(lines) => lines.next_line().await,
            None => Ok(None),
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            let terminated = match pid {
                Some(raw) => match kill(Pid::from_raw(raw as i32), Signal::SIGTERM) {
                    Ok(()) => tokio::time::timeout(TERMINATE_GRACE, child.wait())
                        .await
                        .is_ok(),
                    Err(e) => {
                        debug!("event source (pid={}) refused SIGTERM: {}", raw, e);
                        false
                    }
                },
                // already reaped
                None => true,
            };
            if !terminated {
                warn!("event source (pid={:?}) ignored SIGTERM, killing", pid);
                // kill() also reaps the child
                if let Err(e) = child.kill().await {
                    debug!("event source (pid={:?}) was already gone: {}", pid, e);
                }
            }
            debug!("event source (pid={:?}) stopped", pid);
        }
        self.lines = None;
    }
}

pub struct CommandEventSourceLauncher {
    command: Vec<String>,
    clear_command: Vec<String>,
}

impl CommandEventSourceLauncher {
    pub fn new(command: Vec<String>, clear_command: Vec<String>) -> Self {
        Self {
            command,
            clear_command,
        }
    }
}

#[async_trait]
impl EventSourceLauncher for CommandEventSourceLauncher {
    type Source = CommandEventSource;

    async fn launch(&self) -> io::Result<CommandEventSource> {
        CommandEventSource::spawn(&self.command, &self.clear_command).await
    }
}

/// Lines pushed by another task through an unbounded channel. Closing every sender closes
/// the source.
pub struct ChannelEventSource {
    rx: Option<mpsc::UnboundedReceiver<String>>,
}

impl ChannelEventSource {
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx: Some(rx) })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        match self.rx.as_mut() {
            Some(rx) => Ok(rx.recv().await),
            None => Ok(None),
        }
    }

    async fn shutdown(&mut self) {
        self.rx = None;
    }
}

/// Hands out one prepared [`ChannelEventSource`]; a second launch fails.
pub struct ChannelEventSourceLauncher {
    source: Mutex<Option<ChannelEventSource>>,
}

impl ChannelEventSourceLauncher {
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, source) = ChannelEventSource::channel();
        (
            tx,
            Self {
                source: Mutex::new(Some(source)),
            },
        )
    }
}

#[async_trait]
impl EventSourceLauncher for ChannelEventSourceLauncher {
    type Source = ChannelEventSource;

    async fn launch(&self) -> io::Result<ChannelEventSource> {
        self.source.lock().await.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AlreadyExists, "event source already launched")
        })
    }
}
