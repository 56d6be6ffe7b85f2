use std::net::SocketAddr;

use anyhow::{Context, Result};
use nshide_common::Config;
use tracing::info;

use crate::server::DaemonServer;
use crate::service::HideService;

pub async fn create_and_run_server(config: Config) -> Result<()> {
    let addr: SocketAddr = config
        .server
        .parse()
        .with_context(|| format!("invalid server address {}", config.server))?;

    let service = HideService::from_config(&config);
    let server = DaemonServer::bind(service, addr).await?;
    info!("daemon listening on {}", server.local_addr()?);

    server.run(config.enable_on_start).await
}
