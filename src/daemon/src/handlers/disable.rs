use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;
use crate::structs::DisableResponse;

pub const DISABLE_ENDPOINT: &str = "/disable";

pub async fn disable(State(state): State<DaemonState>) -> axum::response::Result<impl IntoResponse> {
    let stopped = state.service().disable().await;
    Ok(Json(DisableResponse { stopped }))
}
