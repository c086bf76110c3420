//! Model Context Protocol endpoint for the shared browser.
//!
//! An AI agent connected over MCP drives the same `BrowserSessionManager` as
//! the `/api/browser/*` routes, so its interactions are serialized with every
//! other caller. Only the JSON-RPC methods a tool server needs are served:
//! `initialize`, `ping`, `tools/list` and `tools/call`. Requests without an
//! `id` are notifications and get `202` with no body.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use data_encoding::BASE64;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::models::{ClickRequest, NavigateRequest};
use crate::api::AppState;
use crate::browser::BrowserAction;
use crate::errors::ScanError;

pub const PROTOCOL_VERSION: &str = "2025-03-26";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn reply(id: Value, outcome: Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct InputTextArgs {
    selector: String,
    content: String,
}

pub async fn handle_mcp(State(state): State<AppState>, body: Bytes) -> Response {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let error = RpcError::new(PARSE_ERROR, format!("Invalid JSON-RPC message: {}", e));
            return Json(RpcResponse::reply(Value::Null, Err(error))).into_response();
        }
    };

    let Some(id) = request.id else {
        debug!(method = %request.method, "MCP notification");
        return StatusCode::ACCEPTED.into_response();
    };
    if request.jsonrpc != "2.0" {
        let error = RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\"");
        return Json(RpcResponse::reply(id, Err(error))).into_response();
    }

    debug!(method = %request.method, "MCP request");
    let outcome = dispatch(&state, &request.method, request.params).await;
    Json(RpcResponse::reply(id, outcome)).into_response()
}

async fn dispatch(state: &AppState, method: &str, params: Value) -> Result<Value, RpcError> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": "scanwright", "version": env!("CARGO_PKG_VERSION") },
            "instructions": "Drive the scanner's shared browser: navigate, type, click, read cookies, take screenshots.",
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tool_definitions() })),
        "tools/call" => {
            let call: ToolCall = serde_json::from_value(params)
                .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid tools/call params: {}", e)))?;
            call_tool(state, call).await
        }
        other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
    }
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "navigate",
            "description": "Open a URL in the shared browser and wait for the page to load.",
            "inputSchema": {
                "type": "object",
                "properties": { "url": { "type": "string" } },
                "required": ["url"],
            },
        },
        {
            "name": "input_text",
            "description": "Replace the value of the input matching a CSS selector.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "content": { "type": "string" },
                },
                "required": ["selector", "content"],
            },
        },
        {
            "name": "click_element",
            "description": "Click the element matching a CSS selector. With login set, wait for the redirect and report whether cookies changed.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "selector": { "type": "string" },
                    "login": { "type": "boolean", "default": false },
                },
                "required": ["selector"],
            },
        },
        {
            "name": "get_cookies",
            "description": "Cookies currently held by the shared browser.",
            "inputSchema": { "type": "object", "properties": {} },
        },
        {
            "name": "take_screenshot",
            "description": "PNG of the shared browser's viewport. Fails when no browser is running.",
            "inputSchema": { "type": "object", "properties": {} },
        },
    ])
}

fn arguments<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, RpcError> {
    serde_json::from_value(args)
        .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid arguments for {}: {}", tool, e)))
}

async fn call_tool(state: &AppState, call: ToolCall) -> Result<Value, RpcError> {
    let action = match call.name.as_str() {
        "navigate" => BrowserAction::from(arguments::<NavigateRequest>(&call.name, call.arguments)?),
        "input_text" => {
            let args: InputTextArgs = arguments(&call.name, call.arguments)?;
            BrowserAction::Input {
                selector: args.selector,
                text: args.content,
            }
        }
        "click_element" => BrowserAction::from(arguments::<ClickRequest>(&call.name, call.arguments)?),
        "get_cookies" => BrowserAction::Cookies,
        "take_screenshot" => return Ok(screenshot(state).await),
        other => return Err(RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", other))),
    };

    info!(tool = %call.name, "MCP tool call");
    Ok(match state.browser.perform(action).await {
        Ok(output) => text_content(json!(output).to_string(), false),
        Err(e) => tool_failure(&call.name, &e),
    })
}

async fn screenshot(state: &AppState) -> Value {
    let Some(mut session) = state.browser.current().await else {
        return text_content("No browser session".into(), true);
    };
    match session.screenshot().await {
        Ok(png) => json!({
            "content": [{ "type": "image", "data": BASE64.encode(&png), "mimeType": "image/png" }],
            "isError": false,
        }),
        Err(e) => tool_failure("take_screenshot", &e),
    }
}

/// Tool failures are results the calling model can read, not protocol errors.
fn tool_failure(tool: &str, e: &ScanError) -> Value {
    warn!(tool, error = %e, "MCP tool failed");
    text_content(format!("{}: {}", e.classify().error_type, e.reason()), true)
}

fn text_content(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        let names: Vec<String> = tool_definitions()
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            ["navigate", "input_text", "click_element", "get_cookies", "take_screenshot"]
        );
    }

    #[test]
    fn test_error_reply_omits_result() {
        let reply = RpcResponse::reply(json!(4), Err(RpcError::new(METHOD_NOT_FOUND, "nope")));
        let body = serde_json::to_value(&reply).unwrap();
        assert_eq!(body["error"]["code"], -32601);
        assert!(body.get("result").is_none());
        assert_eq!(body["id"], 4);
    }

    #[test]
    fn test_input_text_arguments() {
        let args: InputTextArgs =
            arguments("input_text", json!({"selector": "#user", "content": "admin"})).unwrap();
        assert_eq!(args.content, "admin");
        let missing = arguments::<InputTextArgs>("input_text", json!({"selector": "#user"}));
        assert_eq!(missing.unwrap_err().code, INVALID_PARAMS);
    }
}
