use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::phase::display_name;
use super::state::{PhaseName, PhaseResult, PhaseStatus, ScanOutcome, ScanPhase};

/// Progress broadcast by the orchestrator. Each event renders to one
/// activity-log line.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted {
        scan_id: String,
        target: String,
    },
    PhaseChanged {
        phase: ScanPhase,
    },
    SubPhaseStarted {
        name: PhaseName,
    },
    SubPhaseFinished {
        name: PhaseName,
        result: PhaseResult,
    },
    AgentActivity {
        behavior: String,
        summary: String,
    },
    ReportSaved {
        path: PathBuf,
        alerts: usize,
    },
    ScanFinished {
        outcome: ScanOutcome,
    },
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanEvent::ScanStarted { scan_id, target } => {
                write!(f, "Scan {} started against {}", scan_id, target)
            }
            ScanEvent::PhaseChanged { phase } => write!(f, "Phase -> {}", phase),
            ScanEvent::SubPhaseStarted { name } => write!(f, "{} started", display_name(*name)),
            ScanEvent::SubPhaseFinished { name, result } => {
                let status = match result.status {
                    PhaseStatus::Completed => "completed",
                    PhaseStatus::TimedOut => "timed out",
                    PhaseStatus::Failed => "failed",
                };
                write!(
                    f,
                    "{} {} in {}ms: {}",
                    display_name(*name),
                    status,
                    result.duration_ms(),
                    result.detail
                )
            }
            ScanEvent::AgentActivity { summary, .. } => write!(f, "Agent {}", summary),
            ScanEvent::ReportSaved { path, alerts } => {
                write!(f, "Report saved to {} ({} alerts)", path.display(), alerts)
            }
            ScanEvent::ScanFinished { outcome } => {
                if outcome.success {
                    write!(f, "Scan finished: {}", outcome.message)
                } else {
                    write!(f, "Scan failed: {}", outcome.message)
                }
            }
        }
    }
}
