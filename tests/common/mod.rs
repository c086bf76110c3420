#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use scanwright::agent::{AgentEvent, AgentRun, AutomationAgent};
use scanwright::browser::{BrowserDriver, DriverLauncher};
use scanwright::config::PhaseConfig;
use scanwright::errors::ScanError;
use scanwright::pipeline::ScanRequest;
use scanwright::scanner::{JobHandle, JobKind, JobStatus, ScanReport, VulnerabilityScanner};

pub const TARGET: &str = "https://example-app.test";
pub const PASSWORD: &str = "correct-horse-battery";

pub const REPORT_XML: &str = "<OWASPZAPReport><site name=\"https://example-app.test\"><alerts>\
<alertitem><alert>SQL Injection</alert></alertitem>\
<alertitem><alert>Missing CSP Header</alert></alertitem>\
</alerts></site></OWASPZAPReport>";

pub fn request() -> ScanRequest {
    ScanRequest {
        url: TARGET.into(),
        username: "admin".into(),
        password: PASSWORD.into(),
    }
}

/// One-second polling, sixty-second deadlines.
pub fn phases() -> PhaseConfig {
    PhaseConfig {
        crawl_deadline_secs: 60,
        crawl_poll_interval_ms: 1_000,
        dynamic_crawl_deadline_secs: 60,
        active_scan_deadline_secs: None,
        active_scan_poll_interval_ms: 1_000,
        max_consecutive_poll_errors: 3,
        start_retries: 0,
    }
}

/// Ordered record of what the fakes did and when.
#[derive(Default)]
pub struct Timeline {
    marks: Mutex<Vec<(String, Instant)>>,
}

impl Timeline {
    pub fn mark(&self, name: &str) {
        self.marks.lock().unwrap().push((name.to_string(), Instant::now()));
    }

    pub fn at(&self, name: &str) -> Option<Instant> {
        self.marks
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.marks.lock().unwrap().iter().position(|(n, _)| n == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.marks.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }
}

pub struct FakeAgent {
    pub login_ok: bool,
    pub login_delay: Duration,
    pub explore_delay: Duration,
    pub explore_fails: bool,
    pub timeline: Arc<Timeline>,
    pub login_calls: AtomicU32,
    pub explore_calls: AtomicU32,
}

impl FakeAgent {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self {
            login_ok: true,
            login_delay: Duration::ZERO,
            explore_delay: Duration::from_secs(3),
            explore_fails: false,
            timeline,
            login_calls: AtomicU32::new(0),
            explore_calls: AtomicU32::new(0),
        }
    }

    fn run(behavior: &str, response: &str) -> AgentRun {
        AgentRun {
            behavior: behavior.into(),
            conversation_uuid: Some("conv-1".into()),
            response: Some(response.into()),
            events: vec![
                AgentEvent::ChainStarted { uuid: Some("conv-1".into()) },
                AgentEvent::StepStarted,
                AgentEvent::StepCompleted,
                AgentEvent::ChainCompleted {
                    uuid: Some("conv-1".into()),
                    response: Some(response.into()),
                },
            ],
        }
    }
}

#[async_trait]
impl AutomationAgent for FakeAgent {
    async fn authenticate(&self, _url: &str, _username: &str, password: &str) -> Result<AgentRun, ScanError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.login_delay).await;
        if self.login_ok && password == PASSWORD {
            self.timeline.mark("login done");
            Ok(Self::run("LoginAgent", "Logged in, dashboard visible"))
        } else {
            Err(ScanError::AuthenticationFailed("agent reported: invalid credentials".into()))
        }
    }

    async fn explore_and_interact(&self, _url: &str) -> Result<AgentRun, ScanError> {
        self.explore_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.explore_delay).await;
        self.timeline.mark("explore done");
        if self.explore_fails {
            return Err(ScanError::Agent("chain-error: model overloaded".into()));
        }
        Ok(Self::run("ScrapingAgent", "Visited 12 pages, submitted 3 forms"))
    }

    fn name(&self) -> &str {
        "fake-agent"
    }
}

/// Engine double. Each job kind completes on its Nth status query.
pub struct FakeScanner {
    pub polls_to_complete: HashMap<JobKind, u32>,
    pub failing_job: Option<JobKind>,
    /// Starting this job kind returns the built error.
    pub start_error: Option<(JobKind, fn() -> ScanError)>,
    /// Status queries for this job kind always fail with a transport error.
    pub status_error: Option<JobKind>,
    pub timeline: Arc<Timeline>,
    pub calls: AtomicU32,
    polls: Mutex<HashMap<JobKind, u32>>,
    stops: Mutex<Vec<JobKind>>,
}

impl FakeScanner {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        let polls_to_complete = HashMap::from([
            (JobKind::Spider, 2),
            (JobKind::AjaxSpider, 2),
            (JobKind::ActiveScan, 3),
        ]);
        Self {
            polls_to_complete,
            failing_job: None,
            start_error: None,
            status_error: None,
            timeline,
            calls: AtomicU32::new(0),
            polls: Mutex::new(HashMap::new()),
            stops: Mutex::new(Vec::new()),
        }
    }

    pub fn with_polls(mut self, kind: JobKind, polls: u32) -> Self {
        self.polls_to_complete.insert(kind, polls);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Job kinds the orchestrator asked to stop, in order.
    pub fn stopped(&self) -> Vec<JobKind> {
        self.stops.lock().unwrap().clone()
    }

    fn started(&self, kind: JobKind, mark: &str, handle: JobHandle) -> Result<JobHandle, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((failing, build)) = self.start_error {
            if failing == kind {
                return Err(build());
            }
        }
        self.timeline.mark(mark);
        Ok(handle)
    }
}

#[async_trait]
impl VulnerabilityScanner for FakeScanner {
    async fn start_crawl(&self, _url: &str) -> Result<JobHandle, ScanError> {
        self.started(JobKind::Spider, "spider started", JobHandle::new(JobKind::Spider, "0"))
    }

    async fn start_dynamic_crawl(&self, _url: &str) -> Result<JobHandle, ScanError> {
        self.started(
            JobKind::AjaxSpider,
            "ajax spider started",
            JobHandle::singleton(JobKind::AjaxSpider),
        )
    }

    async fn start_active_scan(&self, _url: &str) -> Result<JobHandle, ScanError> {
        self.started(
            JobKind::ActiveScan,
            "active scan started",
            JobHandle::new(JobKind::ActiveScan, "1"),
        )
    }

    async fn job_status(&self, job: &JobHandle) -> Result<JobStatus, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.status_error == Some(job.kind) {
            return Err(ScanError::Transport("status endpoint returned 502".into()));
        }
        if self.failing_job == Some(job.kind) {
            return Ok(JobStatus::Failed {
                reason: "target refused connection".into(),
            });
        }
        let count = {
            let mut polls = self.polls.lock().unwrap();
            let n = polls.entry(job.kind).or_insert(0);
            *n += 1;
            *n
        };
        let needed = self.polls_to_complete.get(&job.kind).copied().unwrap_or(1);
        if count >= needed {
            self.timeline.mark(&format!("{} done", job.kind));
            Ok(JobStatus::Completed)
        } else {
            Ok(JobStatus::Running { progress: Some(50) })
        }
    }

    async fn stop_job(&self, job: &JobHandle) -> Result<(), ScanError> {
        self.stops.lock().unwrap().push(job.kind);
        self.timeline.mark(&format!("{} stopped", job.kind));
        Ok(())
    }

    async fn fetch_report(&self) -> Result<ScanReport, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ScanReport::xml(REPORT_XML.to_string()))
    }

    fn name(&self) -> &str {
        "fake-engine"
    }
}

/// Launcher for API tests that must never reach a real browser.
pub struct UnavailableLauncher;

#[async_trait]
impl DriverLauncher for UnavailableLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ScanError> {
        Err(ScanError::ResourceUnavailable("chromedriver not installed".into()))
    }
}
