//! Owns the enabled/disabled state of the hide subsystem. Each enable builds a fresh watch
//! list and monitor; each disable tears both down.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use nshide_common::{AddOutcome, Config, RemoveOutcome, RunState, WatchList, WatchListError};
use nshide_monitor::{
    launch, CommandEventSourceLauncher, ConfiguredHideAction, ExitReason, LinuxProcessControl,
    MonitorHandle, MonitorSettings,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::structs::InfoResponse;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("hiding is not enabled")]
    NotEnabled,
    #[error("invalid process name")]
    InvalidName,
    #[error("watch list error: {0}")]
    WatchList(WatchListError),
    #[error("failed to start monitor: {0}")]
    Launch(#[from] io::Error),
}

impl From<WatchListError> for ServiceError {
    fn from(e: WatchListError) -> Self {
        match e {
            // a destroyed list means the monitor behind it has stopped
            WatchListError::Destroyed => ServiceError::NotEnabled,
            WatchListError::InvalidName => ServiceError::InvalidName,
            other => ServiceError::WatchList(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnableOutcome {
    Enabled { entries: usize },
    AlreadyEnabled,
}

/// Starts one monitor for an enabled period.
pub trait MonitorLauncher: Send + Sync {
    fn launch(
        &self,
        watch_list: Arc<WatchList>,
        run_state: Arc<RunState>,
    ) -> io::Result<MonitorHandle>;
}

/// Real processes, the configured event command and hide helper.
pub struct LinuxMonitorLauncher {
    control: Arc<LinuxProcessControl>,
    config: Config,
}

impl LinuxMonitorLauncher {
    pub fn new(config: Config) -> Self {
        Self {
            control: Arc::new(LinuxProcessControl::new()),
            config,
        }
    }
}

impl MonitorLauncher for LinuxMonitorLauncher {
    fn launch(
        &self,
        watch_list: Arc<WatchList>,
        run_state: Arc<RunState>,
    ) -> io::Result<MonitorHandle> {
        let events = CommandEventSourceLauncher::new(
            self.config.event_command.clone(),
            self.config.event_clear_command.clone(),
        );
        let action = ConfiguredHideAction::from_config(self.config.hide_command.as_deref());
        launch(
            Arc::clone(&self.control),
            events,
            action,
            watch_list,
            run_state,
            MonitorSettings::from(&self.config),
        )
    }
}

struct Running {
    watch_list: Arc<WatchList>,
    handle: MonitorHandle,
}

pub struct HideService {
    launcher: Box<dyn MonitorLauncher>,
    watch_list_file: PathBuf,
    run_state: Arc<RunState>,
    running: Mutex<Option<Running>>,
    last_exit: Mutex<Option<ExitReason>>,
}

impl HideService {
    pub fn new(launcher: Box<dyn MonitorLauncher>, watch_list_file: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            watch_list_file: watch_list_file.into(),
            run_state: Arc::new(RunState::new()),
            running: Mutex::new(None),
            last_exit: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Box::new(LinuxMonitorLauncher::new(config.clone())),
            &config.watch_list_file,
        )
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    /// No-op while a monitor is running.
    pub async fn enable(&self) -> Result<EnableOutcome, ServiceError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                return Ok(EnableOutcome::AlreadyEnabled);
            }
        }
        if let Some(finished) = running.take() {
            self.record_exit(finished.handle.join().await).await;
        }

        let watch_list = Arc::new(WatchList::new());
        let entries = watch_list.init(&self.watch_list_file)?;
        let handle = self
            .launcher
            .launch(Arc::clone(&watch_list), Arc::clone(&self.run_state))?;
        info!("hiding enabled with {} watched name(s)", entries);

        *running = Some(Running { watch_list, handle });
        Ok(EnableOutcome::Enabled { entries })
    }

    /// Stops the monitor and waits for its teardown. `None` if it was not running.
    pub async fn disable(&self) -> Option<ExitReason> {
        let current = self.running.lock().await.take()?;
        let reason = current.handle.stop().await;
        info!("hiding disabled: {:?}", reason);
        self.record_exit(reason.clone()).await;
        Some(reason)
    }

    /// Collects a monitor that stopped on its own.
    pub async fn reap(&self) -> Option<ExitReason> {
        let mut running = self.running.lock().await;
        if !running.as_ref()?.handle.is_finished() {
            return None;
        }
        let finished = running.take()?;
        let reason = finished.handle.join().await;
        warn!("monitor stopped on its own: {:?}", reason);
        self.record_exit(reason.clone()).await;
        Some(reason)
    }

    async fn record_exit(&self, reason: ExitReason) {
        *self.last_exit.lock().await = Some(reason);
    }

    async fn watch_list(&self) -> Result<Arc<WatchList>, ServiceError> {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(current) if self.run_state.is_enabled() => Ok(Arc::clone(&current.watch_list)),
            _ => Err(ServiceError::NotEnabled),
        }
    }

    pub async fn add(&self, name: &str) -> Result<AddOutcome, ServiceError> {
        let outcome = self.watch_list().await?.add(name)?;
        info!("add {}: {:?}", name, outcome);
        Ok(outcome)
    }

    pub async fn remove(&self, name: &str) -> Result<RemoveOutcome, ServiceError> {
        let outcome = self.watch_list().await?.remove(name)?;
        info!("remove {}: {:?}", name, outcome);
        Ok(outcome)
    }

    pub async fn list(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.watch_list().await?.snapshot()?)
    }

    pub async fn info(&self) -> InfoResponse {
        let watched = match self.watch_list().await {
            Ok(list) => list.len().unwrap_or(0),
            Err(_) => 0,
        };
        InfoResponse {
            enabled: self.run_state.is_enabled(),
            spawner_count: self.run_state.spawner_count(),
            watched,
            watch_list_file: self.watch_list_file.display().to_string(),
            last_exit: self.last_exit.lock().await.clone(),
        }
    }
}
