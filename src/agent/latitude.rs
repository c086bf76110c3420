use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::events::{read_events, run_result};
use super::provider::{AgentRun, AutomationAgent};
use crate::config::AgentConfig;
use crate::errors::ScanError;

/// Runs named prompt behaviors on the Latitude gateway and reads the streamed
/// result.
pub struct LatitudeAgent {
    client: Client,
    config: AgentConfig,
    api_key: String,
    project_id: u64,
}

impl LatitudeAgent {
    pub fn new(config: AgentConfig) -> Result<Self, ScanError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ScanError::Config("agent.api_key is not set (LATITUDE_API_KEY)".into()))?;
        let project_id = config
            .project_id
            .ok_or_else(|| ScanError::Config("agent.project_id is not set (LATITUDE_PROJECT_ID)".into()))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
            project_id,
        })
    }

    pub fn run_url(&self) -> String {
        format!(
            "{}/api/v3/projects/{}/versions/{}/documents/run",
            self.config.base_url.trim_end_matches('/'),
            self.project_id,
            self.config.version_uuid
        )
    }

    async fn run_behavior(&self, path: &str, parameters: Value) -> Result<AgentRun, ScanError> {
        info!(behavior = path, "Starting agent run");

        let resp = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.api_key)
            .header("accept", "text/event-stream")
            .json(&json!({
                "path": path,
                "parameters": parameters,
                "stream": true,
            }))
            .send()
            .await
            .map_err(|e| ScanError::Transport(format!("Agent request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["message"].as_str().map(String::from))
                .unwrap_or(body);
            if status.is_server_error() {
                return Err(ScanError::Transport(format!("Agent service returned {}: {}", status, message)));
            }
            return Err(ScanError::Agent(format!("{} rejected ({}): {}", path, status, message)));
        }

        let events = read_events(resp.bytes_stream(), path).await?;

        match run_result(&events) {
            Ok(done) => {
                info!(behavior = path, events = events.len(), "Agent run completed");
                Ok(AgentRun {
                    behavior: path.to_string(),
                    conversation_uuid: done.uuid,
                    response: done.response,
                    events,
                })
            }
            Err(reason) => {
                warn!(behavior = path, reason = %reason, "Agent run failed");
                Err(ScanError::Agent(reason))
            }
        }
    }
}

#[async_trait]
impl AutomationAgent for LatitudeAgent {
    async fn authenticate(&self, url: &str, username: &str, password: &str) -> Result<AgentRun, ScanError> {
        let params = json!({ "url": url, "username": username, "password": password });
        self.run_behavior(&self.config.login_behavior, params)
            .await
            .map_err(|e| match e {
                ScanError::Agent(reason) => ScanError::AuthenticationFailed(format!("agent reported: {}", reason)),
                other => ScanError::AuthenticationFailed(format!("agent unreachable: {}", other)),
            })
    }

    async fn explore_and_interact(&self, url: &str) -> Result<AgentRun, ScanError> {
        self.run_behavior(&self.config.explore_behavior, json!({ "url": url }))
            .await
    }

    fn name(&self) -> &str {
        "latitude"
    }
}
