pub mod browser;
pub mod health;
pub mod reports;
pub mod scans;
pub mod status;
