//! Ordered shutdown of one enabled period, and the handle the service keeps while it runs.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use nshide_common::{RunState, WatchList, WatchListError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{channel_pair, HideChannel};
use crate::error::ExitReason;
use crate::event_source::{EventSource, EventSourceLauncher};
use crate::hide_daemon::{HideAction, HideDaemon, HideDaemonExit};
use crate::monitor::{Monitor, MonitorSettings};
use crate::platform::ProcessControl;

/// Resources the monitor holds for one run. Released only by [`Lifecycle::teardown`].
pub struct Lifecycle<E> {
    watch_list: Option<Arc<WatchList>>,
    run_state: Arc<RunState>,
    pub(crate) event_source: Option<E>,
    pub(crate) channel: HideChannel,
    hide_daemon: Option<JoinHandle<HideDaemonExit>>,
    daemon_exit_timeout: Duration,
}

impl<E: EventSource> Lifecycle<E> {
    pub fn new(
        watch_list: Arc<WatchList>,
        run_state: Arc<RunState>,
        channel: HideChannel,
        hide_daemon: JoinHandle<HideDaemonExit>,
        daemon_exit_timeout: Duration,
    ) -> Self {
        Self {
            watch_list: Some(watch_list),
            run_state,
            event_source: None,
            channel,
            hide_daemon: Some(hide_daemon),
            daemon_exit_timeout,
        }
    }

    pub fn watch_list(&self) -> Result<&WatchList, WatchListError> {
        self.watch_list.as_deref().ok_or(WatchListError::Destroyed)
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn attach_event_source(&mut self, source: E) {
        self.event_source = Some(source);
    }

    /// Every step runs even if an earlier one failed.
    pub async fn teardown(&mut self) {
        if let Some(watch_list) = &self.watch_list {
            watch_list.destroy();
            debug!("teardown: watch list destroyed");
        }

        self.run_state.set_enabled(false);
        self.run_state.set_spawner_count(0);

        if let Some(mut source) = self.event_source.take() {
            source.shutdown().await;
            debug!("teardown: event source stopped");
        }

        if let Err(e) = self.channel.terminate().await {
            debug!("teardown: hide daemon already gone: {}", e);
        }

        if let Some(mut handle) = self.hide_daemon.take() {
            match tokio::time::timeout(self.daemon_exit_timeout, &mut handle).await {
                Ok(Ok(exit)) => debug!("teardown: hide daemon exited ({:?})", exit),
                Ok(Err(e)) => warn!("teardown: hide daemon task failed: {}", e),
                Err(_) => {
                    warn!(
                        "teardown: hide daemon did not exit within {:?}, aborting",
                        self.daemon_exit_timeout
                    );
                    handle.abort();
                }
            }
        }

        self.watch_list.take();
        info!("teardown complete");
    }
}

/// A running monitor. Dropping the handle leaves the monitor running.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<ExitReason>,
}

impl MonitorHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the monitor to end on its own.
    pub async fn join(self) -> ExitReason {
        match self.task.await {
            Ok(reason) => reason,
            Err(e) => ExitReason::Fatal(format!("monitor task failed: {}", e)),
        }
    }

    pub async fn stop(self) -> ExitReason {
        self.cancel();
        self.join().await
    }
}

/// Starts the hide daemon and the monitor for one enabled period. `enabled` is set before
/// this returns and cleared by the monitor's teardown.
pub fn launch<P, L, A>(
    control: Arc<P>,
    launcher: L,
    action: A,
    watch_list: Arc<WatchList>,
    run_state: Arc<RunState>,
    settings: MonitorSettings,
) -> io::Result<MonitorHandle>
where
    P: ProcessControl + 'static,
    L: EventSourceLauncher + 'static,
    A: HideAction + 'static,
{
    let (channel, endpoint) = channel_pair()?;
    let hide_daemon = HideDaemon::new(endpoint, Arc::clone(&control), action).spawn();

    run_state.set_enabled(true);
    let lifecycle = Lifecycle::new(
        watch_list,
        run_state,
        channel,
        hide_daemon,
        settings.handoff_timeout,
    );

    let cancel = CancellationToken::new();
    let monitor = Monitor::new(control, launcher, lifecycle, settings, cancel.clone());
    let task = tokio::spawn(monitor.run());
    info!("monitor launched");

    Ok(MonitorHandle { cancel, task })
}
