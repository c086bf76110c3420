use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScanwrightConfig {
    pub engine: EngineConfig,
    pub agent: AgentConfig,
    pub browser: BrowserConfig,
    pub phases: PhaseConfig,
    pub output: OutputConfig,
}

/// OWASP ZAP connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// `host:port` the browser should route through so the engine sees its traffic.
    pub proxy: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: None,
            proxy: None,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<u64>,
    pub version_uuid: String,
    pub login_behavior: String,
    pub explore_behavior: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.latitude.so".to_string(),
            api_key: None,
            project_id: None,
            version_uuid: "live".to_string(),
            login_behavior: "LoginAgent".to_string(),
            explore_behavior: "ScrapingAgent".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub chromedriver_path: String,
    pub port: u16,
    pub headless: bool,
    /// Upper bound for a page to reach `document.readyState == "complete"`.
    pub ready_timeout_secs: u64,
    /// Upper bound for the URL to change after a login click.
    pub login_redirect_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chromedriver_path: "chromedriver".to_string(),
            port: 9515,
            headless: false,
            ready_timeout_secs: 10,
            login_redirect_timeout_secs: 15,
        }
    }
}

impl BrowserConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn login_redirect_timeout(&self) -> Duration {
        Duration::from_secs(self.login_redirect_timeout_secs)
    }
}

/// Per-phase polling budgets. Crawl phases are best-effort reconnaissance and
/// get a short deadline; the active scan runs until the engine says it is done
/// unless a deadline is configured.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub crawl_deadline_secs: u64,
    pub crawl_poll_interval_ms: u64,
    /// Budget for the agent's explore-and-interact run.
    pub dynamic_crawl_deadline_secs: u64,
    pub active_scan_deadline_secs: Option<u64>,
    pub active_scan_poll_interval_ms: u64,
    pub max_consecutive_poll_errors: u32,
    pub start_retries: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            crawl_deadline_secs: 60,
            crawl_poll_interval_ms: 2_000,
            dynamic_crawl_deadline_secs: 60,
            active_scan_deadline_secs: None,
            active_scan_poll_interval_ms: 5_000,
            max_consecutive_poll_errors: 5,
            start_retries: 2,
        }
    }
}

impl PhaseConfig {
    pub fn crawl_deadline(&self) -> Duration {
        Duration::from_secs(self.crawl_deadline_secs)
    }

    pub fn crawl_interval(&self) -> Duration {
        Duration::from_millis(self.crawl_poll_interval_ms)
    }

    pub fn dynamic_crawl_deadline(&self) -> Duration {
        Duration::from_secs(self.dynamic_crawl_deadline_secs)
    }

    pub fn active_scan_deadline(&self) -> Option<Duration> {
        self.active_scan_deadline_secs.map(Duration::from_secs)
    }

    pub fn active_scan_interval(&self) -> Duration {
        Duration::from_millis(self.active_scan_poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Lines of activity log returned by status queries.
    pub log_tail_lines: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./results"),
            log_tail_lines: 50,
        }
    }
}
