use async_trait::async_trait;
use serde::Serialize;

use super::events::AgentEvent;
use crate::errors::ScanError;

/// Result of one finished agent behavior, with the full event list kept for
/// replay into the activity log.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub behavior: String,
    pub conversation_uuid: Option<String>,
    pub response: Option<String>,
    pub events: Vec<AgentEvent>,
}

impl AgentRun {
    pub fn step_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AgentEvent::StepStarted))
            .count()
    }

    pub fn summary(&self) -> String {
        let mut s = format!(
            "{}: {} events, {} steps",
            self.behavior,
            self.events.len(),
            self.step_count()
        );
        if let Some(uuid) = &self.conversation_uuid {
            s.push_str(&format!(", conversation {}", uuid));
        }
        s
    }
}

/// External AI automation service. It drives its own browser, so calls never
/// touch the shared `BrowserSessionManager`.
#[async_trait]
pub trait AutomationAgent: Send + Sync {
    /// Log in to the target. Every failure, agent-reported or transport, is
    /// returned as `ScanError::AuthenticationFailed` with the cause in the reason.
    async fn authenticate(&self, url: &str, username: &str, password: &str) -> Result<AgentRun, ScanError>;

    /// Crawl the target and interact with forms.
    async fn explore_and_interact(&self, url: &str) -> Result<AgentRun, ScanError>;

    fn name(&self) -> &str;
}
