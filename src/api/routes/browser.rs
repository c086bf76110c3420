use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::api::models::{ClickRequest, InputRequest, NavigateRequest};
use crate::api::AppState;
use crate::browser::{ActionOutput, BrowserAction};
use crate::errors::ScanError;

/// PNG of the live browser. Never launches one: without a session the answer
/// is `409`.
pub async fn screenshot(State(state): State<AppState>) -> Result<Response, ScanError> {
    let Some(mut session) = state.browser.current().await else {
        return Ok((StatusCode::CONFLICT, Json(json!({"error": "No browser session"}))).into_response());
    };
    let png = session.screenshot().await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

pub async fn navigate(
    State(state): State<AppState>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<ActionOutput>, ScanError> {
    Ok(Json(state.browser.perform(req.into()).await?))
}

pub async fn input(
    State(state): State<AppState>,
    Json(req): Json<InputRequest>,
) -> Result<Json<ActionOutput>, ScanError> {
    Ok(Json(state.browser.perform(req.into()).await?))
}

pub async fn click(
    State(state): State<AppState>,
    Json(req): Json<ClickRequest>,
) -> Result<Json<ActionOutput>, ScanError> {
    Ok(Json(state.browser.perform(req.into()).await?))
}

pub async fn cookies(State(state): State<AppState>) -> Result<Json<ActionOutput>, ScanError> {
    Ok(Json(state.browser.perform(BrowserAction::Cookies).await?))
}

pub async fn close(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ScanError> {
    let was_active = state.browser.is_active();
    state.browser.release().await?;
    Ok(Json(json!({"closed": was_active})))
}
