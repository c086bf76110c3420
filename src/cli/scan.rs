use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::audit::AuditSession;
use crate::cli::commands::ScanArgs;
use crate::cli::serve::build_services;
use crate::config::load_config;
use crate::errors::ScanError;
use crate::pipeline::{ScanOrchestrator, ScanPhase, ScanRequest, ScanSession};
use crate::utils::format_duration;

/// Run one scan in the foreground, printing progress until it finishes.
/// Ctrl-C cancels the run; the session is still recorded.
pub async fn handle_scan(args: ScanArgs, quiet: bool) -> Result<(), ScanError> {
    let mut config = load_config(args.config.as_deref().map(Path::new)).await?;
    if let Some(output) = args.output {
        config.output.directory = PathBuf::from(output);
    }

    let request = ScanRequest {
        url: args.target,
        username: args.username,
        password: args.password,
    };
    request.validate()?;

    let services = build_services(&config)?;
    let scan_id = uuid::Uuid::new_v4().to_string();
    let secrets = services.secrets.clone().with_password(&request.password);
    let audit = Arc::new(AuditSession::initialize(&services.output_dir, &scan_id, secrets).await?);
    info!(scan_id = %scan_id, target = %request.url, "Starting scan");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = ScanOrchestrator::new(
        request,
        services.phases.clone(),
        services.agent.clone(),
        services.scanner.clone(),
        audit.clone(),
    )
    .with_event_channel(tx);

    let printer_audit = audit.clone();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !quiet {
                println!("{}", printer_audit.redact(&event.to_string()));
            }
        }
    });

    let token = orchestrator.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling scan");
            token.cancel();
        }
    });

    let session = orchestrator.run().await;
    interrupt.abort();
    drop(orchestrator);
    let _ = printer.await;

    print_summary(&session, audit.base_dir());
    outcome_result(&session)
}

fn print_summary(session: &ScanSession, dir: &Path) {
    let elapsed = session
        .finished_at
        .map(|end| (end - session.started_at).num_milliseconds().max(0) as u64)
        .unwrap_or(0);
    println!();
    println!("Scan {} {} in {}", session.id, session.phase, format_duration(elapsed));
    if let Some(path) = &session.report_path {
        println!("Report: {} ({} alerts)", path.display(), session.alert_count.unwrap_or(0));
    }
    println!("Audit trail: {}", dir.display());
}

/// Map a failed session back onto the error kind that ended it, so the
/// process exit code reflects the cause.
fn outcome_result(session: &ScanSession) -> Result<(), ScanError> {
    match &session.phase {
        ScanPhase::ReportReady => Ok(()),
        ScanPhase::Failed { kind, reason } => Err(match kind.as_str() {
            "AuthenticationFailed" => ScanError::AuthenticationFailed(reason.clone()),
            "InvalidTarget" => ScanError::InvalidTarget(reason.clone()),
            "ResourceUnavailable" => ScanError::ResourceUnavailable(reason.clone()),
            "Cancelled" => ScanError::Cancelled(reason.clone()),
            "Timeout" => ScanError::Timeout(reason.clone()),
            "ConfigError" => ScanError::Config(reason.clone()),
            _ => ScanError::EngineFailure(reason.clone()),
        }),
        other => Err(ScanError::Internal(format!("scan ended in {}", other))),
    }
}
