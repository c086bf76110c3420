use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::activity_log::ActivityLog;
use super::utils::atomic_write;
use crate::config::Secrets;
use crate::errors::ScanError;
use crate::pipeline::events::ScanEvent;
use crate::pipeline::state::ScanSession;
use crate::scanner::ScanReport;

pub const REPORT_FILE: &str = "report.xml";
pub const ACTIVITY_LOG_FILE: &str = "activity.log";
pub const SESSION_FILE: &str = "session.json";

/// Durable record of one scan under `<output>/<scan_id>/`.
pub struct AuditSession {
    base_dir: PathBuf,
    scan_id: String,
    log: ActivityLog,
}

impl AuditSession {
    pub async fn initialize(
        output_dir: &Path,
        scan_id: &str,
        secrets: Secrets,
    ) -> Result<Self, ScanError> {
        let base_dir = output_dir.join(scan_id);
        tokio::fs::create_dir_all(&base_dir).await?;

        let log = ActivityLog::create(
            &base_dir.join(ACTIVITY_LOG_FILE),
            &format!("Scanwright activity log for scan {}", scan_id),
            secrets,
        )
        .await?;

        Ok(Self {
            base_dir,
            scan_id: scan_id.to_string(),
            log,
        })
    }

    /// Append a line to the activity log. A failed write is reported through
    /// tracing and never interrupts the scan.
    pub async fn log(&self, message: &str) {
        if let Err(e) = self.log.append(message).await {
            warn!(scan_id = %self.scan_id, error = %e, "Failed to write activity log");
        }
    }

    pub async fn record(&self, event: &ScanEvent) {
        self.log(&event.to_string()).await;
    }

    pub async fn save_report(&self, report: &ScanReport) -> Result<PathBuf, ScanError> {
        let path = self.report_path();
        atomic_write(&path, &report.body).await?;
        info!(path = %path.display(), bytes = report.body.len(), "Report persisted");
        Ok(path)
    }

    pub async fn save_snapshot(&self, session: &ScanSession) -> Result<(), ScanError> {
        let json = serde_json::to_string_pretty(session)?;
        atomic_write(&self.base_dir.join(SESSION_FILE), json).await
    }

    pub fn tail(&self, n: usize) -> Vec<String> {
        self.log.tail(n)
    }

    pub fn redact(&self, text: &str) -> String {
        self.log.redact(text)
    }

    pub fn report_path(&self) -> PathBuf {
        self.base_dir.join(REPORT_FILE)
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }
}
