use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info};

use super::provider::VulnerabilityScanner;
use super::types::{JobHandle, JobKind, JobStatus, ScanReport};
use crate::config::EngineConfig;
use crate::errors::{with_retry, RetryConfig, ScanError};

const API_KEY_HEADER: &str = "X-ZAP-API-Key";

/// Client for the OWASP ZAP JSON API.
pub struct ZapScanner {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl ZapScanner {
    pub fn new(config: &EngineConfig, start_retries: u32) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .no_proxy()
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            retry: RetryConfig {
                max_retries: start_retries,
            },
        })
    }

    async fn send(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, ScanError> {
        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        debug!(path, "Engine request");
        Ok(request.send().await?)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ScanError> {
        let resp = self.send(path, query).await?;
        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => {
                if let Some(error) = engine_error(&body) {
                    return Err(ScanError::EngineFailure(error));
                }
                if status.is_server_error() {
                    return Err(ScanError::Transport(format!("{} returned {}", path, status)));
                }
                Ok(body)
            }
            Err(_) if status.is_server_error() => {
                Err(ScanError::Transport(format!("{} returned {}", path, status)))
            }
            Err(e) => Err(ScanError::EngineFailure(format!(
                "{} returned unreadable body ({}): {}",
                path, status, e
            ))),
        }
    }

    async fn start(&self, kind: JobKind, path: &str, query: &[(&str, &str)]) -> Result<Value, ScanError> {
        let name = format!("start {}", kind);
        with_retry(&name, &self.retry, || self.get_json(path, query)).await
    }
}

/// `{"code": .., "message": ..}` is how the engine reports a rejected call.
fn engine_error(body: &Value) -> Option<String> {
    let code = body.get("code")?.as_str()?;
    let message = body["message"].as_str().unwrap_or("");
    Some(format!("{}: {}", code, message))
}

fn scan_id(body: &Value) -> Result<String, ScanError> {
    body["scan"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ScanError::EngineFailure(format!("No scan id in response: {}", body)))
}

/// The engine reports progress as a numeric string.
fn parse_percent(body: &Value) -> Result<u8, ScanError> {
    let raw = &body["status"];
    let parsed = match raw {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    parsed
        .map(|p| p.min(100) as u8)
        .ok_or_else(|| ScanError::EngineFailure(format!("Unexpected status value: {}", raw)))
}

fn ajax_status(body: &Value) -> JobStatus {
    match body["status"].as_str() {
        Some("stopped") => JobStatus::Completed,
        Some("running") => JobStatus::Running { progress: None },
        Some(other) => JobStatus::Failed {
            reason: format!("ajax spider status '{}'", other),
        },
        None => JobStatus::Failed {
            reason: "ajax spider status missing".into(),
        },
    }
}

#[async_trait]
impl VulnerabilityScanner for ZapScanner {
    async fn start_crawl(&self, url: &str) -> Result<JobHandle, ScanError> {
        let body = self.start(JobKind::Spider, "JSON/spider/action/scan/", &[("url", url)]).await?;
        let handle = JobHandle::new(JobKind::Spider, scan_id(&body)?);
        info!(job = %handle, target = url, "Spider started");
        Ok(handle)
    }

    async fn start_dynamic_crawl(&self, url: &str) -> Result<JobHandle, ScanError> {
        self.start(JobKind::AjaxSpider, "JSON/ajaxSpider/action/scan/", &[("url", url)])
            .await?;
        info!(target = url, "AJAX spider started");
        Ok(JobHandle::singleton(JobKind::AjaxSpider))
    }

    async fn start_active_scan(&self, url: &str) -> Result<JobHandle, ScanError> {
        let body = self
            .start(
                JobKind::ActiveScan,
                "JSON/ascan/action/scan/",
                &[("url", url), ("recurse", "true")],
            )
            .await?;
        let handle = JobHandle::new(JobKind::ActiveScan, scan_id(&body)?);
        info!(job = %handle, target = url, "Active scan started");
        Ok(handle)
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, ScanError> {
        let id = job.id.as_deref().unwrap_or_default();
        match job.kind {
            JobKind::Spider => {
                let body = self.get_json("JSON/spider/view/status/", &[("scanId", id)]).await?;
                Ok(JobStatus::from_percent(parse_percent(&body)?))
            }
            JobKind::AjaxSpider => {
                let body = self.get_json("JSON/ajaxSpider/view/status/", &[]).await?;
                Ok(ajax_status(&body))
            }
            JobKind::ActiveScan => {
                let body = self.get_json("JSON/ascan/view/status/", &[("scanId", id)]).await?;
                Ok(JobStatus::from_percent(parse_percent(&body)?))
            }
        }
    }

    async fn stop_job(&self, job: &JobHandle) -> Result<(), ScanError> {
        let id = job.id.as_deref().unwrap_or_default();
        match job.kind {
            JobKind::Spider => self.get_json("JSON/spider/action/stop/", &[("scanId", id)]).await?,
            JobKind::AjaxSpider => self.get_json("JSON/ajaxSpider/action/stop/", &[]).await?,
            JobKind::ActiveScan => self.get_json("JSON/ascan/action/stop/", &[("scanId", id)]).await?,
        };
        info!(job = %job, "Engine job stopped");
        Ok(())
    }

    async fn fetch_report(&self) -> Result<ScanReport, ScanError> {
        let resp = self.send("OTHER/core/other/xmlreport/", &[]).await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_server_error() {
            return Err(ScanError::Transport(format!("xmlreport returned {}", status)));
        }
        if !status.is_success() {
            let reason = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| engine_error(&v))
                .unwrap_or_else(|| format!("xmlreport returned {}", status));
            return Err(ScanError::EngineFailure(reason));
        }
        info!(bytes = body.len(), "Report fetched");
        Ok(ScanReport::xml(body))
    }

    fn name(&self) -> &str {
        "zap"
    }
}
