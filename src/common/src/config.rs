use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config as RConfig, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_DAEMON_PORT, DEFAULT_WATCH_LIST_FILE, DIVERGENCE_BACKOFF_US,
    DIVERGENCE_TIMEOUT_MS, HANDOFF_TIMEOUT_MS, MAX_SPAWNER_INSTANCES, SPAWNER_BACKOFF_US,
    SPAWNER_POLL_INTERVAL_MS, SPAWNER_PROCESS_NAME, WORKING_DIR,
};

const ENV_PREFIX: &str = "NSHIDE";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: String,
    pub watch_list_file: String,
    pub enable_on_start: bool,

    /// Streams one process-start record per line.
    pub event_command: Vec<String>,
    /// Run once before `event_command` to drop stale records.
    pub event_clear_command: Vec<String>,

    pub spawner_name: String,
    pub max_spawners: usize,
    pub spawner_poll_interval_ms: u64,
    pub spawner_backoff_us: u64,
    pub divergence_backoff_us: u64,
    pub divergence_timeout_ms: u64,
    pub handoff_timeout_ms: u64,

    /// Helper run by the hide daemon with the target pid appended.
    pub hide_command: Option<Vec<String>>,

    pub log_dir: String,
    pub log_level: String,
}

impl Config {
    pub fn spawner_poll_interval(&self) -> Duration {
        Duration::from_millis(self.spawner_poll_interval_ms)
    }

    pub fn spawner_backoff(&self) -> Duration {
        Duration::from_micros(self.spawner_backoff_us)
    }

    pub fn divergence_backoff(&self) -> Duration {
        Duration::from_micros(self.divergence_backoff_us)
    }

    pub fn divergence_timeout(&self) -> Duration {
        Duration::from_millis(self.divergence_timeout_ms)
    }

    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_millis(self.handoff_timeout_ms)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}", self.server)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>> {
        let builder = RConfig::builder()
            .set_default("server", format!("127.0.0.1:{}", DEFAULT_DAEMON_PORT))?
            .set_default("watch_list_file", DEFAULT_WATCH_LIST_FILE)?
            .set_default("enable_on_start", true)?
            .set_default(
                "event_command",
                vec![
                    "logcat",
                    "-b",
                    "events",
                    "-v",
                    "raw",
                    "-s",
                    "am_proc_start",
                ],
            )?
            .set_default("event_clear_command", vec!["logcat", "-b", "events", "-c"])?
            .set_default("spawner_name", SPAWNER_PROCESS_NAME)?
            .set_default("max_spawners", MAX_SPAWNER_INSTANCES as u64)?
            .set_default("spawner_poll_interval_ms", SPAWNER_POLL_INTERVAL_MS)?
            .set_default("spawner_backoff_us", SPAWNER_BACKOFF_US)?
            .set_default("divergence_backoff_us", DIVERGENCE_BACKOFF_US)?
            .set_default("divergence_timeout_ms", DIVERGENCE_TIMEOUT_MS)?
            .set_default("handoff_timeout_ms", HANDOFF_TIMEOUT_MS)?
            .set_default("log_dir", WORKING_DIR)?
            .set_default("log_level", "info")?;
        Ok(builder)
    }

    pub fn load_default_config() -> Result<Config> {
        Self::builder()?
            .build()?
            .try_deserialize()
            .context("failed to build default config")
    }

    /// Defaults, then the TOML file (required only when given explicitly), then `NSHIDE_*`
    /// environment variables.
    pub fn load_config(path: Option<&str>) -> Result<Config> {
        let file = match path {
            Some(path) => File::new(path, FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config: Config = Self::builder()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
            .context("failed to parse config file")?;

        anyhow::ensure!(
            !config.event_command.is_empty(),
            "event_command must name a program"
        );
        anyhow::ensure!(config.max_spawners > 0, "max_spawners must be at least 1");

        Ok(config)
    }
}
