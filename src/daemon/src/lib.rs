pub mod client;
pub mod daemon_run;
mod handlers;
mod routes;
pub mod server;
pub mod service;
mod state;
pub mod structs;

pub use client::DaemonClient;
pub use daemon_run::create_and_run_server;
pub use server::DaemonServer;
pub use service::{EnableOutcome, HideService, LinuxMonitorLauncher, MonitorLauncher, ServiceError};
