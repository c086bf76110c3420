use super::types::ScanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
    /// Whether the error ends the whole run when raised by a phase.
    pub fatal: bool,
}

impl ScanError {
    /// Classify this error into the taxonomy used by the activity log and the
    /// retry helper.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            ScanError::ResourceUnavailable(_) => ErrorClassification {
                error_type: "ResourceUnavailable",
                retryable: false,
                fatal: true,
            },
            ScanError::AuthenticationFailed(_) => ErrorClassification {
                error_type: "AuthenticationFailed",
                retryable: false,
                fatal: true,
            },
            ScanError::Transport(_) => ErrorClassification {
                error_type: "TransportError",
                retryable: true,
                fatal: true,
            },
            ScanError::Polling(_) => ErrorClassification {
                error_type: "PollingError",
                retryable: false,
                fatal: true,
            },
            // A deadline is a degraded outcome, never a run-level failure on its own.
            ScanError::Timeout(_) => ErrorClassification {
                error_type: "Timeout",
                retryable: true,
                fatal: false,
            },
            ScanError::EngineFailure(_) => ErrorClassification {
                error_type: "EngineFailure",
                retryable: false,
                fatal: true,
            },
            ScanError::Agent(_) => ErrorClassification {
                error_type: "AgentError",
                retryable: false,
                fatal: false,
            },
            ScanError::Browser(_) => ErrorClassification {
                error_type: "BrowserError",
                retryable: false,
                fatal: false,
            },
            ScanError::Busy(_) => ErrorClassification {
                error_type: "Busy",
                retryable: false,
                fatal: false,
            },
            ScanError::Cancelled(_) => ErrorClassification {
                error_type: "Cancelled",
                retryable: false,
                fatal: true,
            },
            ScanError::InvalidTarget(_) => ErrorClassification {
                error_type: "InvalidTarget",
                retryable: false,
                fatal: true,
            },
            ScanError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
                fatal: true,
            },
            ScanError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
                fatal: true,
            },
            ScanError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
                fatal: true,
            },
            ScanError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
                fatal: true,
            },
            ScanError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
                fatal: true,
            },
        }
    }

    /// Reason text without the variant prefix, for log lines that already name the kind.
    pub fn reason(&self) -> String {
        match self {
            ScanError::ResourceUnavailable(m)
            | ScanError::AuthenticationFailed(m)
            | ScanError::Transport(m)
            | ScanError::Polling(m)
            | ScanError::Timeout(m)
            | ScanError::EngineFailure(m)
            | ScanError::Agent(m)
            | ScanError::Browser(m)
            | ScanError::Busy(m)
            | ScanError::Cancelled(m)
            | ScanError::InvalidTarget(m)
            | ScanError::Config(m)
            | ScanError::Internal(m) => m.clone(),
            ScanError::Io(e) => e.to_string(),
            ScanError::Json(e) => e.to_string(),
            ScanError::Yaml(e) => e.to_string(),
        }
    }
}
