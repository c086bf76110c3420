mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{FakeAgent, FakeScanner, Timeline, UnavailableLauncher, PASSWORD, TARGET};
use scanwright::api::{build_router, AppState};
use scanwright::browser::BrowserSessionManager;
use scanwright::config::{BrowserConfig, PhaseConfig, Secrets};
use scanwright::pipeline::{ScanRunner, ScanServices};

struct TestApp {
    state: AppState,
    _dir: tempfile::TempDir,
}

fn fast_phases() -> PhaseConfig {
    PhaseConfig {
        crawl_poll_interval_ms: 10,
        active_scan_poll_interval_ms: 10,
        ..PhaseConfig::default()
    }
}

fn create_test_app(agent: FakeAgent, token: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let timeline = agent.timeline.clone();
    let runner = ScanRunner::new(ScanServices {
        agent: Arc::new(agent),
        scanner: Arc::new(FakeScanner::new(timeline)),
        phases: fast_phases(),
        output_dir: dir.path().to_path_buf(),
        secrets: Secrets::default(),
    });
    let browser = BrowserSessionManager::new(Arc::new(UnavailableLauncher), &BrowserConfig::default());
    let state = AppState::new(Arc::new(runner), Arc::new(browser), 20, token.map(String::from));
    TestApp { state, _dir: dir }
}

fn quick_agent() -> FakeAgent {
    let mut agent = FakeAgent::new(Arc::new(Timeline::default()));
    agent.explore_delay = Duration::ZERO;
    agent
}

/// Login never finishes within a test, so the scan stays active.
fn slow_agent() -> FakeAgent {
    let mut agent = FakeAgent::new(Arc::new(Timeline::default()));
    agent.login_delay = Duration::from_secs(3600);
    agent
}

fn app(test: &TestApp) -> axum::Router {
    build_router(test.state.clone())
}

fn make_request(method: &str, uri: &str, body: Option<Value>) -> axum::http::Request<Body> {
    let builder = axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    match body {
        Some(b) => builder.body(Body::from(serde_json::to_string(&b).unwrap())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn scan_body() -> Value {
    json!({ "url": TARGET, "username": "admin", "password": PASSWORD })
}

async fn response_json(response: axum::http::Response<Body>) -> Value {
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();
    if bytes.is_empty() {
        panic!("Empty response body. Status: {}, Headers: {:?}", parts.status, parts.headers);
    }
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("JSON parse error: {}. Body: {:?}", e, String::from_utf8_lossy(&bytes)))
}

#[tokio::test]
async fn test_health_endpoint() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test).oneshot(make_request("GET", "/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "scanwright");
    assert!(body["build_timestamp"].is_string());
}

#[tokio::test]
async fn test_status_before_any_scan_is_idle() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test).oneshot(make_request("GET", "/api/status", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["phase"]["state"], "idle");
    assert_eq!(body["browser_active"], false);
    assert!(body["scan_id"].is_null());
}

#[tokio::test]
async fn test_second_start_conflicts_while_running() {
    let test = create_test_app(slow_agent(), None);

    let response = app(&test)
        .oneshot(make_request("POST", "/api/scans", Some(scan_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response_json(response).await;
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["target"], TARGET);
    let scan_id = body["id"].as_str().unwrap().to_string();

    let response = app(&test)
        .oneshot(make_request("POST", "/api/scans", Some(scan_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response_json(response).await;
    assert_eq!(body["kind"], "Busy");

    let response = app(&test).oneshot(make_request("GET", "/api/status", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["scan_id"], scan_id.as_str());
    assert_eq!(body["running"], true);

    let response = app(&test).oneshot(make_request("POST", "/api/scans/stop", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["id"], scan_id.as_str());
}

#[tokio::test]
async fn test_report_before_completion_is_not_ready() {
    let test = create_test_app(slow_agent(), None);
    let response = app(&test)
        .oneshot(make_request("POST", "/api/scans", Some(scan_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app(&test).oneshot(make_request("GET", "/api/report", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response_json(response).await;
    assert_eq!(body["ready"], false);

    test.state.runner.stop().await;
}

#[tokio::test]
async fn test_report_without_scan_is_not_found() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test).oneshot(make_request("GET", "/api/report", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completed_scan_serves_xml_report() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test)
        .oneshot(make_request("POST", "/api/scans", Some(scan_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let active = test.state.runner.current().await.unwrap();
    let session = tokio::time::timeout(Duration::from_secs(10), active.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(session.outcome.unwrap().success);

    let response = app(&test).oneshot(make_request("GET", "/api/report", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/xml");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("<alertitem>"));

    let response = app(&test).oneshot(make_request("GET", "/api/status", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["report_ready"], true);
    assert_eq!(body["alert_count"], 2);
    assert_eq!(body["results"]["active-scan"]["status"], "completed");
    assert!(!body["log_tail"].as_array().unwrap().is_empty());

    let response = app(&test).oneshot(make_request("GET", "/api/logs?lines=3", None)).await.unwrap();
    let body = response_json(response).await;
    assert_eq!(body["lines"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_target_is_bad_request() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test)
        .oneshot(make_request(
            "POST",
            "/api/scans",
            Some(json!({ "url": "ftp://example-app.test", "username": "admin", "password": "x" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.state.runner.current().await.is_none());
}

#[tokio::test]
async fn test_stop_without_scan_is_not_found() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test).oneshot(make_request("POST", "/api/scans/stop", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_screenshot_without_session_conflicts() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test).oneshot(make_request("GET", "/api/screenshot", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(!test.state.browser.is_active());
}

#[tokio::test]
async fn test_browser_action_reports_unavailable_driver() {
    let test = create_test_app(quick_agent(), None);
    let response = app(&test)
        .oneshot(make_request(
            "POST",
            "/api/browser/navigate",
            Some(json!({ "url": TARGET })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(response).await["kind"], "ResourceUnavailable");
    assert_eq!(test.state.browser.launch_count(), 0);
}

#[tokio::test]
async fn test_bearer_token_required_when_configured() {
    let test = create_test_app(quick_agent(), Some("s3cret-token"));

    let response = app(&test).oneshot(make_request("GET", "/api/status", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .uri("/api/status")
        .header("Authorization", "Bearer s3cret-token")
        .body(Body::empty())
        .unwrap();
    let response = app(&test).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&test).oneshot(make_request("GET", "/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn rpc(id: u32, method: &str, params: Value) -> axum::http::Request<Body> {
    make_request(
        "POST",
        "/mcp",
        Some(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })),
    )
}

#[tokio::test]
async fn test_mcp_initialize_and_list_tools() {
    let test = create_test_app(quick_agent(), None);

    let response = app(&test).oneshot(rpc(1, "initialize", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["serverInfo"]["name"], "scanwright");
    assert!(body["result"]["capabilities"]["tools"].is_object());

    let body = response_json(app(&test).oneshot(rpc(2, "tools/list", json!({}))).await.unwrap()).await;
    let names: Vec<&str> = body["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["navigate", "input_text", "click_element", "get_cookies", "take_screenshot"]
    );
}

#[tokio::test]
async fn test_mcp_tool_failure_is_readable_result() {
    let test = create_test_app(quick_agent(), None);

    let call = json!({ "name": "navigate", "arguments": { "url": TARGET } });
    let body = response_json(app(&test).oneshot(rpc(3, "tools/call", call)).await.unwrap()).await;
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["isError"], true);
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("ResourceUnavailable"), "{}", text);

    let call = json!({ "name": "take_screenshot" });
    let body = response_json(app(&test).oneshot(rpc(4, "tools/call", call)).await.unwrap()).await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(body["result"]["content"][0]["text"], "No browser session");
    assert!(!test.state.browser.is_active());
}

#[tokio::test]
async fn test_mcp_protocol_errors() {
    let test = create_test_app(quick_agent(), None);

    let body = response_json(app(&test).oneshot(rpc(5, "resources/list", json!({}))).await.unwrap()).await;
    assert_eq!(body["error"]["code"], -32601);

    let call = json!({ "name": "input_text", "arguments": { "selector": "#user" } });
    let body = response_json(app(&test).oneshot(rpc(6, "tools/call", call)).await.unwrap()).await;
    assert_eq!(body["error"]["code"], -32602);

    let notification = make_request(
        "POST",
        "/mcp",
        Some(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
    );
    let response = app(&test).oneshot(notification).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let garbled = axum::http::Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let body = response_json(app(&test).oneshot(garbled).await.unwrap()).await;
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_mcp_requires_bearer_token() {
    let test = create_test_app(quick_agent(), Some("s3cret-token"));
    let response = app(&test).oneshot(rpc(7, "tools/list", json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
