use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::api::models::{LogsQuery, StatusResponse};
use crate::api::AppState;
use crate::pipeline::ScanPhase;

const MAX_LOG_LINES: usize = 500;

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let browser_active = state.browser.is_active();

    let Some(active) = state.runner.current().await else {
        return Json(StatusResponse {
            scan_id: None,
            target: None,
            phase: ScanPhase::Idle,
            running: false,
            outcome: None,
            results: Default::default(),
            report_ready: false,
            alert_count: None,
            log_tail: Vec::new(),
            browser_active,
        });
    };

    let session = active.snapshot().await;
    Json(StatusResponse {
        scan_id: Some(session.id),
        target: Some(session.target),
        report_ready: matches!(session.phase, ScanPhase::ReportReady),
        phase: session.phase,
        running: active.is_running(),
        outcome: session.outcome,
        results: session.results,
        alert_count: session.alert_count,
        log_tail: active.audit.tail(state.log_tail_lines),
        browser_active,
    })
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(active) = state.runner.current().await else {
        return Err((StatusCode::NOT_FOUND, Json(json!({"error": "No scan has been started"}))));
    };
    let lines = query.lines.unwrap_or(state.log_tail_lines).min(MAX_LOG_LINES);
    Ok(Json(json!({
        "scan_id": active.id,
        "lines": active.audit.tail(lines),
    })))
}
