use clap::Parser;
use tracing_subscriber::EnvFilter;

use scanwright::cli::{self, Commands};
use scanwright::config;
use scanwright::errors::ScanError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => cli::serve::handle_serve(args).await,
        Commands::Scan(args) => cli::scan::handle_scan(args, cli.quiet).await,
        Commands::Logs(args) => cli::logs::handle_logs(args).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            ScanError::Config(_) | ScanError::Yaml(_) => 2,
            ScanError::ResourceUnavailable(_) => 3,
            ScanError::AuthenticationFailed(_) => 4,
            ScanError::InvalidTarget(_) => 5,
            ScanError::Cancelled(_) => 130,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), ScanError> {
    let path = std::path::PathBuf::from(&args.config);
    let _config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}
