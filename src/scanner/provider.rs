use async_trait::async_trait;

use super::types::{JobHandle, JobStatus, ScanReport};
use crate::errors::ScanError;

/// Phases of the external vulnerability scan engine. Starts return a handle
/// that `job_status` reports on; the orchestrator does the polling.
#[async_trait]
pub trait VulnerabilityScanner: Send + Sync {
    /// Traditional link-following spider.
    async fn start_crawl(&self, url: &str) -> Result<JobHandle, ScanError>;

    /// JavaScript-aware crawl driven by the engine's own browser.
    async fn start_dynamic_crawl(&self, url: &str) -> Result<JobHandle, ScanError>;

    async fn start_active_scan(&self, url: &str) -> Result<JobHandle, ScanError>;

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, ScanError>;

    /// Halt a job the orchestrator stopped waiting for, so the engine is idle
    /// for the next phase or the next scan.
    async fn stop_job(&self, job: &JobHandle) -> Result<(), ScanError>;

    /// Only meaningful once the active scan completed or ran out of time.
    async fn fetch_report(&self) -> Result<ScanReport, ScanError>;

    fn name(&self) -> &str;
}
