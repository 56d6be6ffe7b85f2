use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::HideService;

#[derive(Clone)]
pub(crate) struct DaemonState {
    service: Arc<HideService>,
    cancellation_token: CancellationToken,
}

impl DaemonState {
    pub fn new(service: Arc<HideService>, cancellation_token: CancellationToken) -> Self {
        Self {
            service,
            cancellation_token,
        }
    }

    pub fn service(&self) -> &HideService {
        &self.service
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }
}
