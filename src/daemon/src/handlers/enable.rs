use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;

pub const ENABLE_ENDPOINT: &str = "/enable";

pub async fn enable(State(state): State<DaemonState>) -> axum::response::Result<impl IntoResponse> {
    let outcome = state.service().enable().await.map_err(StatusCode::from)?;
    Ok(Json(outcome))
}
