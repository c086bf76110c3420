use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::agent::LatitudeAgent;
use crate::api::{self, AppState};
use crate::browser::{BrowserSessionManager, ChromeDriverLauncher};
use crate::cli::commands::ServeArgs;
use crate::config::{load_config, ScanwrightConfig, Secrets};
use crate::errors::ScanError;
use crate::pipeline::{ScanRunner, ScanServices};
use crate::scanner::ZapScanner;

pub const API_TOKEN_ENV: &str = "SCANWRIGHT_API_TOKEN";

/// Wire the engine and agent clients from configuration.
pub fn build_services(config: &ScanwrightConfig) -> Result<ScanServices, ScanError> {
    let scanner = ZapScanner::new(&config.engine, config.phases.start_retries)?;
    let agent = LatitudeAgent::new(config.agent.clone())?;

    let secrets = Secrets::new(
        [&config.engine.api_key, &config.agent.api_key]
            .into_iter()
            .flatten()
            .cloned(),
    );

    Ok(ScanServices {
        agent: Arc::new(agent),
        scanner: Arc::new(scanner),
        phases: config.phases.clone(),
        output_dir: config.output.directory.clone(),
        secrets,
    })
}

pub async fn handle_serve(args: ServeArgs) -> Result<(), ScanError> {
    let config = load_config(args.config.as_deref().map(Path::new)).await?;
    tokio::fs::create_dir_all(&config.output.directory).await?;

    let runner = Arc::new(ScanRunner::new(build_services(&config)?));
    let launcher = ChromeDriverLauncher::new(config.browser.clone(), config.engine.proxy.clone());
    let browser = Arc::new(BrowserSessionManager::new(Arc::new(launcher), &config.browser));

    let api_token = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty());
    if api_token.is_none() {
        warn!("{} is not set, the control API is unauthenticated", API_TOKEN_ENV);
    }

    let state = AppState::new(runner.clone(), browser.clone(), config.output.log_tail_lines, api_token);
    let app = api::build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScanError::Internal(format!("Server error: {}", e)))?;

    info!("Shutting down");
    if let Some(id) = runner.stop().await {
        info!(scan_id = %id, "Cancelled running scan");
        if let Some(active) = runner.current().await {
            active.wait().await;
        }
    }
    browser.release().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_services_collects_secrets() {
        let mut config = ScanwrightConfig::default();
        config.engine.api_key = Some("zap-key".into());
        config.agent.api_key = Some("lat-key".into());
        config.agent.project_id = Some(7);

        let services = build_services(&config).unwrap();
        assert_eq!(services.secrets.keys(), ["zap-key".to_string(), "lat-key".to_string()]);
        assert_eq!(services.scanner.name(), "zap");
        assert_eq!(services.agent.name(), "latitude");
    }

    #[test]
    fn test_build_services_requires_agent_credentials() {
        let config = ScanwrightConfig::default();
        assert!(matches!(build_services(&config), Err(ScanError::Config(_))));
    }
}
