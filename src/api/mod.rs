pub mod auth;
pub mod errors;
pub mod mcp;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::browser::BrowserSessionManager;
use crate::pipeline::ScanRunner;

#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<ScanRunner>,
    pub browser: Arc<BrowserSessionManager>,
    pub log_tail_lines: usize,
    /// Bearer token required on every route except health, when set.
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        runner: Arc<ScanRunner>,
        browser: Arc<BrowserSessionManager>,
        log_tail_lines: usize,
        api_token: Option<String>,
    ) -> Self {
        Self {
            runner,
            browser,
            log_tail_lines,
            api_token: api_token.map(Arc::from),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/scans", post(routes::scans::create_scan))
        .route("/api/scans/stop", post(routes::scans::stop_scan))
        .route("/api/status", get(routes::status::get_status))
        .route("/api/logs", get(routes::status::get_logs))
        .route("/api/report", get(routes::reports::get_report))
        .route("/api/screenshot", get(routes::browser::screenshot))
        .route("/api/browser/navigate", post(routes::browser::navigate))
        .route("/api/browser/input", post(routes::browser::input))
        .route("/api/browser/click", post(routes::browser::click))
        .route("/api/browser/cookies", get(routes::browser::cookies))
        .route("/api/browser/close", post(routes::browser::close))
        .route("/mcp", post(mcp::handle_mcp))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::api_auth_middleware));

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
