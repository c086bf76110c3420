use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::events::ScanEvent;
use super::state::*;
use crate::agent::AutomationAgent;
use crate::audit::AuditSession;
use crate::config::PhaseConfig;
use crate::errors::ScanError;
use crate::poller::{poll_until_done, PollFailure, PollOutcome, PollPolicy, PollReport};
use crate::scanner::{JobHandle, JobStatus, VulnerabilityScanner};
use crate::utils::truncate_detail;

/// Drives one scan through Authenticate, the concurrent crawl pair, the active
/// scan and the report.
///
/// State lives behind `Arc<RwLock<ScanSession>>` so status readers never wait
/// on a phase; the lock is only held to copy a slot in or out.
pub struct ScanOrchestrator {
    request: ScanRequest,
    phases: PhaseConfig,
    agent: Arc<dyn AutomationAgent>,
    scanner: Arc<dyn VulnerabilityScanner>,
    audit: Arc<AuditSession>,
    session: Arc<RwLock<ScanSession>>,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl ScanOrchestrator {
    pub fn new(
        request: ScanRequest,
        phases: PhaseConfig,
        agent: Arc<dyn AutomationAgent>,
        scanner: Arc<dyn VulnerabilityScanner>,
        audit: Arc<AuditSession>,
    ) -> Self {
        let session = ScanSession::new(audit.scan_id(), &request);
        Self {
            request,
            phases,
            agent,
            scanner,
            audit,
            session: Arc::new(RwLock::new(session)),
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    /// Replace the orchestrator's cancel token with an external one so callers
    /// holding it can stop the run.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn session(&self) -> Arc<RwLock<ScanSession>> {
        self.session.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn audit(&self) -> Arc<AuditSession> {
        self.audit.clone()
    }

    /// Run the scan to a terminal state and return the final session. Failures
    /// end up in the session's phase and outcome, never as a panic or an early
    /// return that drops partial results.
    pub async fn run(&self) -> ScanSession {
        let scan_id = self.audit.scan_id().to_string();
        info!(scan_id = %scan_id, target = %self.request.url, "Scan started");
        self.emit(ScanEvent::ScanStarted {
            scan_id: scan_id.clone(),
            target: self.request.url.clone(),
        })
        .await;

        let outcome = match self.execute().await {
            Ok(message) => {
                info!(scan_id = %scan_id, "Scan completed");
                ScanOutcome {
                    success: true,
                    message,
                }
            }
            Err(e) => {
                let kind = e.classify().error_type;
                error!(scan_id = %scan_id, kind, error = %e, "Scan failed");
                self.set_phase(ScanPhase::failed(&e)).await;
                ScanOutcome {
                    success: false,
                    message: format!("{}: {}", kind, e.reason()),
                }
            }
        };

        let snapshot = {
            let mut session = self.session.write().await;
            session.outcome = Some(outcome.clone());
            session.finished_at = Some(Utc::now());
            session.clone()
        };
        self.emit(ScanEvent::ScanFinished { outcome }).await;
        if let Err(e) = self.audit.save_snapshot(&snapshot).await {
            warn!(scan_id = %scan_id, error = %e, "Failed to write session snapshot");
        }
        snapshot
    }

    async fn execute(&self) -> Result<String, ScanError> {
        self.check_cancelled()?;
        self.set_phase(ScanPhase::Authenticating).await;
        self.recorded(PhaseName::Login, self.authenticate()).await?;

        self.check_cancelled()?;
        self.set_phase(ScanPhase::Crawling).await;
        let (crawl, _) = tokio::join!(
            self.recorded(PhaseName::Crawl, self.engine_crawl()),
            self.recorded(PhaseName::DynamicCrawl, self.agent_exploration()),
        );
        // Both slots are recorded by now. Only a fatal engine error aborts.
        if let Err(e) = crawl {
            if e.classify().fatal {
                return Err(e);
            }
            warn!(error = %e, "Engine crawl degraded; continuing with the active scan");
        }

        self.check_cancelled()?;
        self.set_phase(ScanPhase::ActiveScanning).await;
        self.recorded(PhaseName::ActiveScan, self.active_scan()).await?;

        self.check_cancelled()?;
        let report = self.recorded(PhaseName::Report, self.report()).await?;
        self.set_phase(ScanPhase::ReportReady).await;
        Ok(report.detail)
    }

    async fn authenticate(&self) -> Result<PhaseResult, ScanError> {
        let started = Utc::now();
        let r = &self.request;
        let run = self
            .cancellable(self.agent.authenticate(&r.url, &r.username, &r.password))
            .await
            .map_err(|e| match e {
                ScanError::AuthenticationFailed(_) | ScanError::Cancelled(_) => e,
                other => ScanError::AuthenticationFailed(other.to_string()),
            })?;

        self.emit(ScanEvent::AgentActivity {
            behavior: run.behavior.clone(),
            summary: run.summary(),
        })
        .await;
        let detail = run
            .response
            .as_deref()
            .map(truncate_detail)
            .unwrap_or_else(|| "authenticated".into());
        Ok(PhaseResult::new(PhaseStatus::Completed, detail, started))
    }

    /// Spider, then AJAX spider, sharing one crawl deadline. The AJAX spider
    /// gets whatever the spider left over and is skipped when nothing is left.
    async fn engine_crawl(&self) -> Result<PhaseResult, ScanError> {
        let started = Utc::now();
        let clock = Instant::now();
        let url = &self.request.url;
        let interval = self.phases.crawl_interval();
        let budget = self.phases.crawl_deadline();

        let spider = self.cancellable(self.scanner.start_crawl(url)).await?;
        let spider_report = self.watch_job(&spider, &self.poll_policy(interval, Some(budget))).await;
        self.conclude(&spider, &spider_report).await?;

        let left = budget.saturating_sub(clock.elapsed());
        if left.is_zero() {
            warn!(job = %spider, "Crawl deadline spent by the spider; skipping the AJAX spider");
            return Ok(PhaseResult::new(
                PhaseStatus::TimedOut,
                format!("{} {}; ajax spider skipped", spider, spider_report.outcome),
                started,
            )
            .with_queries(spider_report.queries));
        }

        let ajax = self.cancellable(self.scanner.start_dynamic_crawl(url)).await?;
        let ajax_report = self.watch_job(&ajax, &self.poll_policy(interval, Some(left))).await;
        self.conclude(&ajax, &ajax_report).await?;

        let status = if spider_report.outcome.is_completed() && ajax_report.outcome.is_completed() {
            PhaseStatus::Completed
        } else {
            PhaseStatus::TimedOut
        };
        let detail = format!(
            "{} {}; {} {}",
            spider, spider_report.outcome, ajax, ajax_report.outcome
        );
        Ok(PhaseResult::new(status, detail, started).with_queries(spider_report.queries + ajax_report.queries))
    }

    /// Never fails the run: errors and timeouts come back as degraded results.
    async fn agent_exploration(&self) -> Result<PhaseResult, ScanError> {
        let started = Utc::now();
        let deadline = self.phases.dynamic_crawl_deadline();

        let run = self
            .cancellable(async {
                tokio::time::timeout(deadline, self.agent.explore_and_interact(&self.request.url))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ScanError::Timeout(format!(
                            "agent exploration still running after {}s",
                            deadline.as_secs()
                        )))
                    })
            })
            .await;

        let result = match run {
            Ok(run) => {
                let summary = run.summary();
                self.emit(ScanEvent::AgentActivity {
                    behavior: run.behavior,
                    summary: summary.clone(),
                })
                .await;
                PhaseResult::new(PhaseStatus::Completed, summary, started)
            }
            Err(ScanError::Timeout(reason)) => {
                warn!(reason = %reason, "Agent exploration timed out");
                PhaseResult::new(PhaseStatus::TimedOut, reason, started)
            }
            Err(e) => {
                warn!(error = %e, "Agent exploration failed; continuing with engine crawl results");
                PhaseResult::new(
                    PhaseStatus::Failed,
                    format!("{}: {}", e.classify().error_type, truncate_detail(&e.reason())),
                    started,
                )
            }
        };
        Ok(result)
    }

    async fn active_scan(&self) -> Result<PhaseResult, ScanError> {
        let started = Utc::now();
        let job = self
            .cancellable(self.scanner.start_active_scan(&self.request.url))
            .await?;
        let policy = self.poll_policy(self.phases.active_scan_interval(), self.phases.active_scan_deadline());
        let report = self.watch_job(&job, &policy).await;
        self.conclude(&job, &report).await?;

        let status = if report.outcome.is_completed() {
            PhaseStatus::Completed
        } else {
            PhaseStatus::TimedOut
        };
        Ok(PhaseResult::new(status, format!("{} {}", job, report.outcome), started)
            .with_queries(report.queries))
    }

    async fn report(&self) -> Result<PhaseResult, ScanError> {
        let started = Utc::now();
        let report = self.cancellable(self.scanner.fetch_report()).await?;
        let path = self.audit.save_report(&report).await?;
        let alerts = report.alert_count();
        {
            let mut session = self.session.write().await;
            session.report_path = Some(path.clone());
            session.alert_count = Some(alerts);
        }
        self.emit(ScanEvent::ReportSaved {
            path: path.clone(),
            alerts,
        })
        .await;
        Ok(PhaseResult::new(
            PhaseStatus::Completed,
            format!("{} alerts written to {}", alerts, path.display()),
            started,
        ))
    }

    /// Run one unit of work and store its result slot, failed or not.
    async fn recorded<F>(&self, name: PhaseName, work: F) -> Result<PhaseResult, ScanError>
    where
        F: Future<Output = Result<PhaseResult, ScanError>>,
    {
        let started = Utc::now();
        self.emit(ScanEvent::SubPhaseStarted { name }).await;
        let result = work.await;
        let slot = match &result {
            Ok(r) => r.clone(),
            Err(e) => PhaseResult::new(
                PhaseStatus::Failed,
                format!("{}: {}", e.classify().error_type, truncate_detail(&e.reason())),
                started,
            ),
        };
        self.session.write().await.results.insert(name, slot.clone());
        self.emit(ScanEvent::SubPhaseFinished { name, result: slot }).await;
        result
    }

    async fn watch_job(&self, job: &JobHandle, policy: &PollPolicy) -> PollReport<JobStatus> {
        let scanner = self.scanner.as_ref();
        poll_until_done(
            || scanner.job_status(job),
            JobStatus::is_completed,
            JobStatus::failure,
            policy,
        )
        .await
    }

    /// Stop a job the run no longer waits for, then settle its report.
    async fn conclude(&self, job: &JobHandle, report: &PollReport<JobStatus>) -> Result<(), ScanError> {
        if matches!(
            report.outcome,
            PollOutcome::TimedOut | PollOutcome::Failed(PollFailure::Cancelled)
        ) {
            if let Err(e) = self.scanner.stop_job(job).await {
                warn!(job = %job, error = %e, "Failed to stop engine job");
            }
        }
        settle(job, report)
    }

    fn poll_policy(&self, interval: Duration, deadline: Option<Duration>) -> PollPolicy {
        PollPolicy::new(interval, deadline)
            .with_max_errors(self.phases.max_consecutive_poll_errors)
            .with_cancel_token(self.cancel_token.clone())
    }

    async fn cancellable<T>(&self, work: impl Future<Output = Result<T, ScanError>>) -> Result<T, ScanError> {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => Err(cancelled()),
            result = work => result,
        }
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel_token.is_cancelled() {
            Err(cancelled())
        } else {
            Ok(())
        }
    }

    async fn set_phase(&self, phase: ScanPhase) {
        self.session.write().await.phase = phase.clone();
        info!(scan_id = %self.audit.scan_id(), phase = %phase, "Phase transition");
        self.emit(ScanEvent::PhaseChanged { phase }).await;
    }

    /// Record the event in the activity log and forward it to the channel.
    async fn emit(&self, event: ScanEvent) {
        self.audit.record(&event).await;
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn cancelled() -> ScanError {
    ScanError::Cancelled("scan stopped by request".into())
}

/// Turn a polling report into the phase's verdict. Completed and timed-out
/// jobs both move the run forward.
fn settle(job: &JobHandle, report: &PollReport<JobStatus>) -> Result<(), ScanError> {
    match &report.outcome {
        PollOutcome::Completed => Ok(()),
        PollOutcome::TimedOut => {
            warn!(job = %job, queries = report.queries, "Job reached its deadline; keeping partial results");
            Ok(())
        }
        PollOutcome::Failed(PollFailure::Job(reason)) => {
            Err(ScanError::EngineFailure(format!("{}: {}", job, reason)))
        }
        PollOutcome::Failed(PollFailure::Polling(reason)) => {
            Err(ScanError::Polling(format!("{}: {}", job, reason)))
        }
        PollOutcome::Failed(PollFailure::Cancelled) => Err(cancelled()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::JobKind;

    fn report(outcome: PollOutcome) -> PollReport<JobStatus> {
        PollReport {
            outcome,
            queries: 3,
            last_status: None,
            elapsed: Duration::from_secs(6),
        }
    }

    #[test]
    fn test_settle_timeout_moves_forward() {
        let job = JobHandle::new(JobKind::Spider, "0");
        assert!(settle(&job, &report(PollOutcome::TimedOut)).is_ok());
        assert!(settle(&job, &report(PollOutcome::Completed)).is_ok());
    }

    #[test]
    fn test_settle_failures_map_to_taxonomy() {
        let job = JobHandle::new(JobKind::ActiveScan, "2");
        assert!(matches!(
            settle(&job, &report(PollOutcome::Failed(PollFailure::Job("target unreachable".into())))),
            Err(ScanError::EngineFailure(m)) if m == "active scan #2: target unreachable"
        ));
        assert!(matches!(
            settle(&job, &report(PollOutcome::Failed(PollFailure::Polling("5 errors".into())))),
            Err(ScanError::Polling(_))
        ));
        assert!(matches!(
            settle(&job, &report(PollOutcome::Failed(PollFailure::Cancelled))),
            Err(ScanError::Cancelled(_))
        ));
    }
}
