pub mod poll;
pub mod types;

pub use poll::poll_until_done;
pub use types::{PollFailure, PollOutcome, PollPolicy, PollReport};
