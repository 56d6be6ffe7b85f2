use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;

pub const INFO_ENDPOINT: &str = "/info";

pub async fn info(State(state): State<DaemonState>) -> axum::response::Result<impl IntoResponse> {
    Ok(Json(state.service().info().await))
}
