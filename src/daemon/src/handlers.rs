use axum::http::StatusCode;

use crate::service::ServiceError;

pub mod add;
pub mod disable;
pub mod enable;
pub mod info;
pub mod list;
pub mod remove;
pub mod terminate;

impl From<ServiceError> for StatusCode {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotEnabled => StatusCode::CONFLICT,
            ServiceError::InvalidName => StatusCode::BAD_REQUEST,
            ServiceError::WatchList(_) | ServiceError::Launch(_) => {
                tracing::error!("request failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
