use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use axum::Router;
use nshide_common::constants::{PID_FILE, STDERR_FILE, STDOUT_FILE};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::routes::ROUTES;
use crate::service::HideService;
use crate::state::DaemonState;

const REAP_INTERVAL: Duration = Duration::from_millis(500);

fn get_router(state: DaemonState) -> Router {
    let mut router = Router::new();
    for (path, method_router) in ROUTES.iter() {
        router = router.route(path, method_router.clone());
    }
    router.with_state(state)
}

pub struct DaemonServer {
    service: Arc<HideService>,
    listener: TcpListener,
    cancellation_token: CancellationToken,
}

impl DaemonServer {
    pub async fn bind(service: HideService, addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                bail!(
                    "Port {} is already in use. Is another nshide daemon running?",
                    addr.port()
                )
            }
            Err(e) => bail!("Failed to bind to address {}: {}", addr, e),
        };

        Ok(Self {
            service: Arc::new(service),
            listener,
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until terminated. SIGUSR1 disables hiding; SIGINT and SIGTERM terminate.
    pub async fn run(self, enable_on_start: bool) -> anyhow::Result<()> {
        let cancellation_token = self.cancellation_token.clone();
        let state = DaemonState::new(Arc::clone(&self.service), cancellation_token.clone());
        let server = tokio::spawn(axum::serve(self.listener, get_router(state)).into_future());

        if enable_on_start {
            if let Err(e) = self.service.enable().await {
                warn!("failed to enable on start: {}", e);
            }
        }

        let mut usr1 = signal(SignalKind::user_defined1()).context("failed to watch SIGUSR1")?;
        let mut term = signal(SignalKind::terminate()).context("failed to watch SIGTERM")?;
        let mut reap = tokio::time::interval(REAP_INTERVAL);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    debug!("DaemonServer cancelled");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("SIGINT received");
                    break;
                }
                _ = term.recv() => {
                    info!("SIGTERM received");
                    break;
                }
                _ = usr1.recv() => {
                    info!("SIGUSR1 received, disabling");
                    self.service.disable().await;
                }
                _ = reap.tick() => {
                    self.service.reap().await;
                }
            }
        }

        self.service.disable().await;
        server.abort();
        info!("daemon stopped");
        Ok(())
    }

    /// Removes the files written when the daemon was backgrounded.
    pub fn cleanup() -> anyhow::Result<()> {
        for file in [PID_FILE, STDOUT_FILE, STDERR_FILE] {
            match std::fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e).with_context(|| format!("Failed to remove {}", file)),
            }
        }
        Ok(())
    }
}
