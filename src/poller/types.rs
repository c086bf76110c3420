use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// How a single polling loop is bounded.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` means the loop runs until the job itself reports a terminal state.
    pub deadline: Option<Duration>,
    /// Consecutive failed status queries tolerated before giving up.
    pub max_consecutive_errors: u32,
    pub cancel: Option<CancellationToken>,
}

impl PollPolicy {
    pub fn new(interval: Duration, deadline: Option<Duration>) -> Self {
        Self {
            interval,
            deadline,
            max_consecutive_errors: 5,
            cancel: None,
        }
    }

    pub fn with_max_errors(mut self, max: u32) -> Self {
        self.max_consecutive_errors = max.max(1);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum PollFailure {
    /// The job reported a terminal failure state.
    Job(String),
    /// The status endpoint kept erroring.
    Polling(String),
    Cancelled,
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Job(reason) => write!(f, "job failed: {}", reason),
            Self::Polling(reason) => write!(f, "polling error: {}", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "failure", rename_all = "snake_case")]
pub enum PollOutcome {
    Completed,
    TimedOut,
    Failed(PollFailure),
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Failed(failure) => write!(f, "failed ({})", failure),
        }
    }
}

/// Result of one polling loop.
#[derive(Debug, Clone)]
pub struct PollReport<S> {
    pub outcome: PollOutcome,
    pub queries: u32,
    pub last_status: Option<S>,
    pub elapsed: Duration,
}
