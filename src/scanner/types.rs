use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Spider,
    AjaxSpider,
    ActiveScan,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Spider => write!(f, "spider"),
            JobKind::AjaxSpider => write!(f, "ajax spider"),
            JobKind::ActiveScan => write!(f, "active scan"),
        }
    }
}

/// Reference to one running engine job. The AJAX spider is a singleton in the
/// engine and has no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub kind: JobKind,
    pub id: Option<String>,
}

impl JobHandle {
    pub fn new(kind: JobKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    pub fn singleton(kind: JobKind) -> Self {
        Self { kind, id: None }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} #{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Running { progress: Option<u8> },
    Completed,
    Failed { reason: String },
}

impl JobStatus {
    /// Map a percent-complete reading; 100 or more is done.
    pub fn from_percent(percent: u8) -> Self {
        if percent >= 100 {
            JobStatus::Completed
        } else {
            JobStatus::Running {
                progress: Some(percent),
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    pub fn failure(&self) -> Option<String> {
        match self {
            JobStatus::Failed { reason } => Some(reason.clone()),
            _ => None,
        }
    }
}

/// Findings document produced by the engine after the active scan. The body is
/// kept as the engine rendered it.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub content_type: String,
    pub body: String,
    pub generated_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn xml(body: String) -> Self {
        Self {
            content_type: "application/xml".into(),
            body,
            generated_at: Utc::now(),
        }
    }

    /// Number of alert entries in an engine XML report.
    pub fn alert_count(&self) -> usize {
        self.body.matches("<alertitem>").count()
    }
}
