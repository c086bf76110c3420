use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::api::models::ScanAccepted;
use crate::api::AppState;
use crate::errors::ScanError;
use crate::pipeline::ScanRequest;

/// Accept a scan and return before any phase runs.
pub async fn create_scan(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> Result<(StatusCode, Json<ScanAccepted>), ScanError> {
    let active = state.runner.start(req).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ScanAccepted {
            id: active.id.clone(),
            status: "accepted",
            target: active.target.clone(),
            created_at: active.started_at,
        }),
    ))
}

pub async fn stop_scan(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.runner.stop().await {
        Some(id) => Ok(Json(json!({"stopped": true, "id": id}))),
        None => Err((StatusCode::NOT_FOUND, Json(json!({"error": "No active scan found"})))),
    }
}
