pub mod events;
pub mod orchestrator;
pub mod phase;
pub mod runner;
pub mod state;

pub use events::ScanEvent;
pub use orchestrator::ScanOrchestrator;
pub use runner::{ActiveScan, ScanRunner, ScanServices};
pub use state::{PhaseName, PhaseResult, PhaseStatus, ScanOutcome, ScanPhase, ScanRequest, ScanSession};
