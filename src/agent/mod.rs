pub mod events;
pub mod latitude;
pub mod provider;

pub use events::{read_events, run_result, AgentEvent, RunCompletion};
pub use latitude::LatitudeAgent;
pub use provider::{AgentRun, AutomationAgent};
