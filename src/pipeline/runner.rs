use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::orchestrator::ScanOrchestrator;
use super::state::{ScanRequest, ScanSession};
use crate::agent::AutomationAgent;
use crate::audit::AuditSession;
use crate::config::{PhaseConfig, Secrets};
use crate::errors::ScanError;
use crate::scanner::VulnerabilityScanner;

/// Collaborators shared by every scan the process runs.
#[derive(Clone)]
pub struct ScanServices {
    pub agent: Arc<dyn AutomationAgent>,
    pub scanner: Arc<dyn VulnerabilityScanner>,
    pub phases: PhaseConfig,
    pub output_dir: PathBuf,
    /// Configured API keys; kept out of activity logs.
    pub secrets: Secrets,
}

/// Handle to the scan a runner started most recently.
pub struct ActiveScan {
    pub id: String,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub session: Arc<RwLock<ScanSession>>,
    pub cancel_token: CancellationToken,
    pub audit: Arc<AuditSession>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<ScanSession>>>,
}

impl ActiveScan {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> ScanSession {
        self.session.read().await.clone()
    }

    /// Wait for the run to finish. Only the first caller receives the final
    /// session; later callers get `None`.
    pub async fn wait(&self) -> Option<ScanSession> {
        let task = self.task.lock().await.take()?;
        match task.await {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(scan_id = %self.id, error = %e, "Scan task ended abnormally");
                None
            }
        }
    }
}

/// Clears the running flag however the scan task ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Starts scans in the background, one at a time. A start while a scan is
/// still running is rejected with `ScanError::Busy`.
pub struct ScanRunner {
    services: ScanServices,
    current: Mutex<Option<Arc<ActiveScan>>>,
}

impl ScanRunner {
    pub fn new(services: ScanServices) -> Self {
        Self {
            services,
            current: Mutex::new(None),
        }
    }

    /// Accept a scan and return at once; the run continues on its own task.
    pub async fn start(&self, request: ScanRequest) -> Result<Arc<ActiveScan>, ScanError> {
        request.validate()?;

        let mut current = self.current.lock().await;
        if let Some(active) = current.as_ref() {
            if active.is_running() {
                return Err(ScanError::Busy(format!("scan {} is still running", active.id)));
            }
        }

        let scan_id = uuid::Uuid::new_v4().to_string();
        let secrets = self.services.secrets.clone().with_password(&request.password);
        let audit = Arc::new(AuditSession::initialize(&self.services.output_dir, &scan_id, secrets).await?);

        let target = request.url.clone();
        let orchestrator = ScanOrchestrator::new(
            request,
            self.services.phases.clone(),
            self.services.agent.clone(),
            self.services.scanner.clone(),
            audit.clone(),
        );
        let session = orchestrator.session();
        let cancel_token = orchestrator.cancel_token();

        let running = Arc::new(AtomicBool::new(true));
        let guard = RunningGuard(running.clone());
        let task = tokio::spawn(async move {
            let _guard = guard;
            orchestrator.run().await
        });

        info!(scan_id = %scan_id, target = %target, "Scan accepted");
        let active = Arc::new(ActiveScan {
            id: scan_id,
            target,
            started_at: Utc::now(),
            session,
            cancel_token,
            audit,
            running,
            task: Mutex::new(Some(task)),
        });
        *current = Some(active.clone());
        Ok(active)
    }

    pub async fn current(&self) -> Option<Arc<ActiveScan>> {
        self.current.lock().await.clone()
    }

    /// Cancel the running scan, if any, and return its id.
    pub async fn stop(&self) -> Option<String> {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(active) if active.is_running() => {
                info!(scan_id = %active.id, "Stopping scan");
                active.cancel_token.cancel();
                Some(active.id.clone())
            }
            _ => None,
        }
    }

    pub fn services(&self) -> &ScanServices {
        &self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentRun;
    use crate::pipeline::state::ScanPhase;
    use crate::scanner::{JobHandle, JobStatus, ScanReport};
    use async_trait::async_trait;

    /// Agent whose login never returns.
    struct StuckAgent;

    #[async_trait]
    impl AutomationAgent for StuckAgent {
        async fn authenticate(&self, _: &str, _: &str, _: &str) -> Result<AgentRun, ScanError> {
            std::future::pending().await
        }
        async fn explore_and_interact(&self, _: &str) -> Result<AgentRun, ScanError> {
            std::future::pending().await
        }
        fn name(&self) -> &str {
            "stuck"
        }
    }

    struct NoScanner;

    #[async_trait]
    impl VulnerabilityScanner for NoScanner {
        async fn start_crawl(&self, _: &str) -> Result<JobHandle, ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        async fn start_dynamic_crawl(&self, _: &str) -> Result<JobHandle, ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        async fn start_active_scan(&self, _: &str) -> Result<JobHandle, ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        async fn job_status(&self, _: &JobHandle) -> Result<JobStatus, ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        async fn stop_job(&self, _: &JobHandle) -> Result<(), ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        async fn fetch_report(&self) -> Result<ScanReport, ScanError> {
            Err(ScanError::Internal("not expected".into()))
        }
        fn name(&self) -> &str {
            "none"
        }
    }

    fn runner(dir: &std::path::Path) -> ScanRunner {
        ScanRunner::new(ScanServices {
            agent: Arc::new(StuckAgent),
            scanner: Arc::new(NoScanner),
            phases: PhaseConfig::default(),
            output_dir: dir.to_path_buf(),
            secrets: Secrets::default(),
        })
    }

    fn request() -> ScanRequest {
        ScanRequest {
            url: "https://example-app.test".into(),
            username: "admin".into(),
            password: "correct-horse".into(),
        }
    }

    #[tokio::test]
    async fn test_second_start_is_busy_until_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());

        let first = runner.start(request()).await.unwrap();
        assert!(first.is_running());

        let second = runner.start(request()).await;
        assert!(matches!(second, Err(ScanError::Busy(_))));

        assert_eq!(runner.stop().await.as_deref(), Some(first.id.as_str()));
        let finished = first.wait().await.unwrap();
        assert!(matches!(finished.phase, ScanPhase::Failed { ref kind, .. } if kind == "Cancelled"));
        assert!(!first.is_running());

        let third = runner.start(request()).await.unwrap();
        assert_ne!(third.id, first.id);
        runner.stop().await;
        third.wait().await;
    }

    #[tokio::test]
    async fn test_invalid_target_rejected_before_claiming_slot() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let mut bad = request();
        bad.url = "javascript:alert(1)".into();
        assert!(matches!(runner.start(bad).await, Err(ScanError::InvalidTarget(_))));
        assert!(runner.current().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_without_scan_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(runner(dir.path()).stop().await.is_none());
    }
}
