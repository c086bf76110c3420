pub mod activity_log;
pub mod session;
pub mod utils;

pub use activity_log::{read_tail, ActivityLog};
pub use session::AuditSession;
pub use utils::atomic_write;
