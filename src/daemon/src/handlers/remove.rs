use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;
use crate::structs::NameRequest;

pub const REMOVE_ENDPOINT: &str = "/remove";

pub async fn remove(
    State(state): State<DaemonState>,
    Json(payload): Json<NameRequest>,
) -> axum::response::Result<impl IntoResponse> {
    let outcome = state
        .service()
        .remove(&payload.name)
        .await
        .map_err(StatusCode::from)?;
    Ok(Json(outcome))
}
