pub mod agent;
pub mod api;
pub mod audit;
pub mod browser;
pub mod cli;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod poller;
pub mod scanner;
pub mod utils;
