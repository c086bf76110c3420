use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::browser::BrowserAction;
use crate::pipeline::{PhaseName, PhaseResult, ScanOutcome, ScanPhase};

#[derive(Serialize)]
pub struct ScanAccepted {
    pub id: String,
    pub status: &'static str,
    pub target: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub scan_id: Option<String>,
    pub target: Option<String>,
    pub phase: ScanPhase,
    pub running: bool,
    pub outcome: Option<ScanOutcome>,
    pub results: std::collections::BTreeMap<PhaseName, PhaseResult>,
    pub report_ready: bool,
    pub alert_count: Option<usize>,
    pub log_tail: Vec<String>,
    pub browser_active: bool,
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub lines: Option<usize>,
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

#[derive(Deserialize)]
pub struct InputRequest {
    pub selector: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct ClickRequest {
    pub selector: String,
    #[serde(default)]
    pub login: bool,
}

impl From<NavigateRequest> for BrowserAction {
    fn from(r: NavigateRequest) -> Self {
        BrowserAction::Navigate { url: r.url }
    }
}

impl From<InputRequest> for BrowserAction {
    fn from(r: InputRequest) -> Self {
        BrowserAction::Input {
            selector: r.selector,
            text: r.text,
        }
    }
}

impl From<ClickRequest> for BrowserAction {
    fn from(r: ClickRequest) -> Self {
        BrowserAction::Click {
            selector: r.selector,
            login: r.login,
        }
    }
}
