//! The process-start monitor: waits for the spawners, then pauses every watched app on
//! launch and hands it to the hide daemon once it has its own mount namespace.

use std::sync::Arc;
use std::time::Duration;

use nshide_common::namespace::{DiscoveryOptions, NamespaceError};
use nshide_common::{parse_event_line, Config, NamespaceTracker};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::{ExitReason, MonitorError};
use crate::event_source::{EventSource, EventSourceLauncher};
use crate::lifecycle::Lifecycle;
use crate::platform::ProcessControl;

#[derive(Clone, Debug)]
pub struct MonitorSettings {
    pub discovery: DiscoveryOptions,
    pub divergence_backoff: Duration,
    /// `None` waits for divergence without bound.
    pub divergence_timeout: Option<Duration>,
    pub handoff_timeout: Duration,
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        let divergence_timeout = match config.divergence_timeout_ms {
            0 => None,
            _ => Some(config.divergence_timeout()),
        };
        Self {
            discovery: DiscoveryOptions {
                spawner_name: config.spawner_name.clone(),
                max_instances: config.max_spawners,
                poll_interval: config.spawner_poll_interval(),
                candidate_backoff: config.spawner_backoff(),
            },
            divergence_backoff: config.divergence_backoff(),
            divergence_timeout,
            handoff_timeout: config.handoff_timeout(),
        }
    }
}

pub struct Monitor<P, L: EventSourceLauncher> {
    control: Arc<P>,
    tracker: NamespaceTracker<Arc<P>>,
    launcher: L,
    lifecycle: Lifecycle<L::Source>,
    settings: MonitorSettings,
    cancel: CancellationToken,
}

impl<P, L> Monitor<P, L>
where
    P: ProcessControl + 'static,
    L: EventSourceLauncher,
{
    pub fn new(
        control: Arc<P>,
        launcher: L,
        lifecycle: Lifecycle<L::Source>,
        settings: MonitorSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tracker: NamespaceTracker::new(Arc::clone(&control)),
            control,
            launcher,
            lifecycle,
            settings,
            cancel,
        }
    }

    /// Runs until cancelled or a terminating condition, then tears everything down.
    pub async fn run(mut self) -> ExitReason {
        let reason = match self.drive().await {
            Ok(reason) => reason,
            Err(e) => {
                let reason = ExitReason::from(e);
                if let ExitReason::Fatal(msg) = &reason {
                    error!("monitor failed: {}", msg);
                }
                reason
            }
        };
        info!("monitor stopping: {:?}", reason);
        self.lifecycle.teardown().await;
        reason
    }

    async fn drive(&mut self) -> Result<ExitReason, MonitorError> {
        self.tracker.discover_init()?;

        let count = self
            .tracker
            .discover_spawners(
                self.control.as_ref(),
                &self.settings.discovery,
                &self.cancel,
            )
            .await?
            .len();
        info!("found {} spawner namespace(s)", count);
        self.lifecycle.run_state().set_spawner_count(count);

        let source = tokio::select! {
            _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
            source = self.launcher.launch() => source.map_err(MonitorError::EventSource)?,
        };
        self.lifecycle.attach_event_source(source);

        loop {
            let source = self
                .lifecycle
                .event_source
                .as_mut()
                .ok_or_else(|| MonitorError::EventSource(std::io::ErrorKind::NotConnected.into()))?;

            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(MonitorError::Cancelled),
                line = source.next_line() => line.map_err(MonitorError::EventSource)?,
            };

            let Some(line) = line else {
                warn!("event source closed");
                return Ok(ExitReason::EventSourceClosed);
            };

            let Some(event) = parse_event_line(&line) else {
                trace!("unparsable event line: {}", line.trim_end());
                continue;
            };

            if !self.lifecycle.watch_list()?.contains(&event.name)? {
                continue;
            }

            debug!("watched process started: {} pid={}", event.name, event.pid);
            if let Some(reason) = self.intercept(event.pid).await? {
                return Ok(reason);
            }
        }
    }

    /// Pause, wait for the target's own namespace, hand it off. `Ok(None)` means keep going.
    async fn intercept(&mut self, pid: i32) -> Result<Option<ExitReason>, MonitorError> {
        if let Err(e) = self.control.pause(pid) {
            debug!("could not pause {}: {}", pid, e);
            return Ok(None);
        }

        match self
            .tracker
            .await_divergence(
                pid,
                self.settings.divergence_backoff,
                self.settings.divergence_timeout,
                &self.cancel,
            )
            .await
        {
            Ok(ns) => debug!("pid {} diverged into ns={}", pid, ns),
            Err(NamespaceError::Cancelled) => {
                self.resume(pid);
                return Err(MonitorError::Cancelled);
            }
            Err(e) => {
                warn!("abandoning pid {}: {}", pid, e);
                self.resume(pid);
                return Ok(None);
            }
        }

        // the hide daemon may never get to resume the target if the exchange is cut short
        let timeout = self.settings.handoff_timeout;
        let response = tokio::select! {
            _ = self.cancel.cancelled() => {
                self.resume(pid);
                return Err(MonitorError::Cancelled);
            }
            response = tokio::time::timeout(timeout, self.lifecycle.channel.request(pid)) => {
                match response {
                    Ok(response) => response?,
                    Err(_) => {
                        self.resume(pid);
                        return Err(MonitorError::HandoffTimeout { pid, timeout });
                    }
                }
            }
        };

        if response != 0 {
            info!("hide daemon is exiting (status {})", response);
            return Ok(Some(ExitReason::HideDaemonTerminated));
        }
        debug!("pid {} handed off", pid);
        Ok(None)
    }

    fn resume(&self, pid: i32) {
        if let Err(e) = self.control.resume(pid) {
            debug!("could not resume {}: {}", pid, e);
        }
    }
}
