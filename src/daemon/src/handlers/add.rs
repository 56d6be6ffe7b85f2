use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::state::DaemonState;
use crate::structs::NameRequest;

pub const ADD_ENDPOINT: &str = "/add";

pub async fn add(
    State(state): State<DaemonState>,
    Json(payload): Json<NameRequest>,
) -> axum::response::Result<impl IntoResponse> {
    let outcome = state
        .service()
        .add(&payload.name)
        .await
        .map_err(StatusCode::from)?;
    Ok(Json(outcome))
}
