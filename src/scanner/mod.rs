pub mod provider;
pub mod types;
pub mod zap;

pub use provider::VulnerabilityScanner;
pub use types::{JobHandle, JobKind, JobStatus, ScanReport};
pub use zap::ZapScanner;
