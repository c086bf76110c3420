use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Polling error: {0}")]
    Polling(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Scan engine failure: {0}")]
    EngineFailure(String),

    #[error("Automation agent error: {0}")]
    Agent(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("A scan is already running: {0}")]
    Busy(String),

    #[error("Scan cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ScanError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScanError::Timeout(e.to_string())
        } else {
            ScanError::Transport(e.to_string())
        }
    }
}
