use tracing::debug;

use crate::errors::ScanError;

const REDACTED: &str = "[REDACTED]";

/// API keys shorter than this are too likely to match ordinary log text.
const MIN_KEY_LEN: usize = 4;

/// Resolve a config secret. `$NAME` and `${NAME}` read the environment; an
/// unset variable is a config error rather than a key sent verbatim.
pub fn resolve_credential(value: &str) -> Result<String, ScanError> {
    let Some(reference) = value.strip_prefix('$') else {
        return Ok(value.to_string());
    };
    let name = reference
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);
    if name.is_empty() {
        return Err(ScanError::Config(format!("Empty environment reference '{}'", value)));
    }
    match std::env::var(name) {
        Ok(resolved) => {
            debug!(var = %name, "Resolved credential from environment");
            Ok(resolved)
        }
        Err(_) => Err(ScanError::Config(format!(
            "Environment variable {} referenced by the config is not set",
            name
        ))),
    }
}

/// Values that must never reach the activity log: the engine and agent API
/// keys from configuration, plus the target password of the running scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secrets {
    keys: Vec<String>,
    password: Option<String>,
}

impl Secrets {
    pub fn new<I: IntoIterator<Item = String>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().filter(|k| !k.is_empty()).collect(),
            password: None,
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string()).filter(|p| !p.is_empty());
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The password is masked at any length since the user chose it; short
    /// API keys are left alone.
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        if let Some(password) = &self.password {
            result = result.replace(password.as_str(), REDACTED);
        }
        for key in self.keys.iter().filter(|k| k.len() >= MIN_KEY_LEN) {
            result = result.replace(key.as_str(), REDACTED);
        }
        result
    }
}
