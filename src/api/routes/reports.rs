use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::AppState;
use crate::errors::ScanError;
use crate::pipeline::ScanPhase;

/// Report of the most recent scan. While the scan is still running this
/// answers `202 {"ready": false}` rather than an error.
pub async fn get_report(State(state): State<AppState>) -> Result<Response, ScanError> {
    let Some(active) = state.runner.current().await else {
        return Ok((StatusCode::NOT_FOUND, Json(json!({"error": "No scan has been started"}))).into_response());
    };

    let session = active.snapshot().await;
    match (&session.phase, &session.report_path) {
        (ScanPhase::ReportReady, Some(path)) => {
            let body = tokio::fs::read(path).await?;
            Ok((
                [
                    (header::CONTENT_TYPE, "application/xml".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"{}-report.xml\"", session.id),
                    ),
                ],
                body,
            )
                .into_response())
        }
        (ScanPhase::Failed { kind, reason }, _) => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "ready": false,
                "error": "Scan ended without a report",
                "kind": kind,
                "reason": reason,
            })),
        )
            .into_response()),
        (phase, _) => Ok((
            StatusCode::ACCEPTED,
            Json(json!({"ready": false, "scan_id": session.id, "phase": phase.name()})),
        )
            .into_response()),
    }
}
