pub mod formatting;
pub mod truncation;

pub use formatting::format_duration;
pub use truncation::truncate_detail;
