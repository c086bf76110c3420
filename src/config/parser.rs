use std::path::Path;
use std::time::Duration;

use super::credentials::resolve_credential;
use super::types::ScanwrightConfig;
use crate::errors::ScanError;
use tracing::{info, warn};

pub async fn parse_config(path: &Path) -> Result<ScanwrightConfig, ScanError> {
    if !path.exists() {
        return Err(ScanError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(ScanError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let mut config: ScanwrightConfig = serde_yaml::from_str(&content)?;
    resolve_secrets(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the file config when given, otherwise defaults, then layer the
/// environment on top.
pub async fn load_config(path: Option<&Path>) -> Result<ScanwrightConfig, ScanError> {
    let mut config = match path {
        Some(p) => parse_config(p).await?,
        None => ScanwrightConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config)?;
    info!(
        engine = %config.engine.base_url,
        agent = %config.agent.base_url,
        proxy = config.engine.proxy.as_deref().unwrap_or("none"),
        "Configuration loaded"
    );
    Ok(config)
}

fn resolve_secrets(config: &mut ScanwrightConfig) -> Result<(), ScanError> {
    if let Some(key) = config.engine.api_key.as_mut() {
        *key = resolve_credential(key)?;
    }
    if let Some(key) = config.agent.api_key.as_mut() {
        *key = resolve_credential(key)?;
    }
    Ok(())
}

pub fn apply_env_overrides<F>(config: &mut ScanwrightConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("ZAP_BASE_URL") {
        config.engine.base_url = v;
    }
    if let Some(v) = lookup("ZAP_API_KEY") {
        config.engine.api_key = Some(v);
    }
    if let Some(v) = lookup("ZAP_PROXY") {
        config.engine.proxy = Some(v);
    }
    if let Some(v) = lookup("LATITUDE_API_KEY") {
        config.agent.api_key = Some(v);
    }
    if let Some(v) = lookup("LATITUDE_PROJECT_ID") {
        match v.trim().parse::<u64>() {
            Ok(id) => config.agent.project_id = Some(id),
            Err(_) => warn!(value = %v, "Ignoring non-numeric LATITUDE_PROJECT_ID"),
        }
    }
    if let Some(v) = lookup("LATITUDE_VERSION_UUID") {
        config.agent.version_uuid = v;
    }
}

/// Reject polling budgets that could never make progress.
pub fn validate_config(config: &ScanwrightConfig) -> Result<(), ScanError> {
    let phases = &config.phases;
    if phases.crawl_poll_interval_ms == 0 || phases.active_scan_poll_interval_ms == 0 {
        return Err(ScanError::Config("Poll intervals must be greater than zero".into()));
    }
    if phases.crawl_deadline() < phases.crawl_interval() {
        return Err(ScanError::Config(format!(
            "Crawl deadline ({}s) is shorter than its poll interval ({}ms)",
            phases.crawl_deadline_secs, phases.crawl_poll_interval_ms
        )));
    }
    if let Some(deadline) = phases.active_scan_deadline_secs {
        if Duration::from_secs(deadline) < phases.active_scan_interval() {
            return Err(ScanError::Config(format!(
                "Active scan deadline ({}s) is shorter than its poll interval ({}ms)",
                deadline, phases.active_scan_poll_interval_ms
            )));
        }
    }
    if phases.dynamic_crawl_deadline_secs == 0 {
        return Err(ScanError::Config("dynamic_crawl_deadline_secs must be at least 1".into()));
    }
    if phases.max_consecutive_poll_errors == 0 {
        return Err(ScanError::Config("max_consecutive_poll_errors must be at least 1".into()));
    }
    if config.engine.api_key.as_deref().map_or(true, str::is_empty) {
        warn!("No scan engine API key configured");
    }
    Ok(())
}
