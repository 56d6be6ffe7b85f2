use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;
use crate::structs::ListResponse;

pub const LIST_ENDPOINT: &str = "/list";

pub async fn list(State(state): State<DaemonState>) -> axum::response::Result<impl IntoResponse> {
    let names = state.service().list().await.map_err(StatusCode::from)?;
    Ok(Json(ListResponse { names }))
}
