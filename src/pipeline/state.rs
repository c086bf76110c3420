use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ScanError;

/// What a caller asks to scan. Immutable once accepted.
#[derive(Clone, Deserialize)]
pub struct ScanRequest {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ScanRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanRequest")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ScanRequest {
    /// Reject anything that is not an absolute http(s) URL with a host.
    pub fn validate(&self) -> Result<(), ScanError> {
        let parsed = reqwest::Url::parse(&self.url)
            .map_err(|e| ScanError::InvalidTarget(format!("{}: {}", self.url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidTarget(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ScanError::InvalidTarget(format!("{} has no host", self.url)));
        }
        if self.username.is_empty() {
            return Err(ScanError::InvalidTarget("username is required".into()));
        }
        Ok(())
    }
}

/// Orchestrator state machine position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanPhase {
    Idle,
    Authenticating,
    Crawling,
    ActiveScanning,
    ReportReady,
    Failed { kind: String, reason: String },
}

impl ScanPhase {
    pub fn failed(error: &ScanError) -> Self {
        ScanPhase::Failed {
            kind: error.classify().error_type.to_string(),
            reason: error.reason(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::ReportReady | ScanPhase::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Authenticating => "authenticating",
            ScanPhase::Crawling => "crawling",
            ScanPhase::ActiveScanning => "active_scanning",
            ScanPhase::ReportReady => "report_ready",
            ScanPhase::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Failed { kind, reason } => write!(f, "failed ({}: {})", kind, reason),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Result slots of a run, one per unit of work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseName {
    Login,
    Crawl,
    DynamicCrawl,
    ActiveScan,
    Report,
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Crawl => write!(f, "crawl"),
            Self::DynamicCrawl => write!(f, "dynamic-crawl"),
            Self::ActiveScan => write!(f, "active-scan"),
            Self::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    /// Deadline reached; a degraded outcome, not a failure of the run.
    TimedOut,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub status: PhaseStatus,
    pub detail: String,
    pub queries: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PhaseResult {
    pub fn new(status: PhaseStatus, detail: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            status,
            detail: detail.into(),
            queries: 0,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn with_queries(mut self, queries: u32) -> Self {
        self.queries = queries;
        self
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanOutcome {
    pub success: bool,
    pub message: String,
}

/// Run-scoped aggregate for one scan. Partial results stay in place when the
/// run fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSession {
    pub id: String,
    pub target: String,
    pub username: String,
    pub phase: ScanPhase,
    pub results: BTreeMap<PhaseName, PhaseResult>,
    pub outcome: Option<ScanOutcome>,
    pub report_path: Option<PathBuf>,
    pub alert_count: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanSession {
    pub fn new(id: &str, request: &ScanRequest) -> Self {
        Self {
            id: id.to_string(),
            target: request.url.clone(),
            username: request.username.clone(),
            phase: ScanPhase::Idle,
            results: BTreeMap::new(),
            outcome: None,
            report_path: None,
            alert_count: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn result(&self, phase: PhaseName) -> Option<&PhaseResult> {
        self.results.get(&phase)
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> ScanRequest {
        ScanRequest {
            url: url.into(),
            username: "admin".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn test_validate_accepts_https() {
        assert!(request("https://example-app.test/login").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http() {
        assert!(matches!(
            request("ftp://example-app.test").validate(),
            Err(ScanError::InvalidTarget(_))
        ));
        assert!(request("not a url").validate().is_err());
    }

    #[test]
    fn test_request_debug_hides_password() {
        let dbg = format!("{:?}", request("https://example-app.test"));
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn test_failed_phase_from_error() {
        let phase = ScanPhase::failed(&ScanError::AuthenticationFailed("bad password".into()));
        assert_eq!(
            phase,
            ScanPhase::Failed {
                kind: "AuthenticationFailed".into(),
                reason: "bad password".into()
            }
        );
        assert!(phase.is_terminal());
        assert_eq!(phase.to_string(), "failed (AuthenticationFailed: bad password)");
    }

    #[test]
    fn test_session_serializes_phase_slots_by_name() {
        let mut session = ScanSession::new("s-1", &request("https://example-app.test"));
        session.results.insert(
            PhaseName::DynamicCrawl,
            PhaseResult::new(PhaseStatus::TimedOut, "deadline", Utc::now()),
        );
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["results"]["dynamic-crawl"]["status"], "timed_out");
        assert_eq!(json["phase"]["state"], "idle");
        assert!(json.get("password").is_none());
    }
}
