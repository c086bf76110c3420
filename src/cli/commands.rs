use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "scanwright", version, about = "AI-assisted dynamic application security scanning")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP control API
    Serve(ServeArgs),
    /// Run a single scan in the foreground
    Scan(ScanArgs),
    /// Print a scan's activity log
    Logs(LogsArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long, default_value = "5000")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Target web application URL
    #[arg(short, long)]
    pub target: String,

    /// Login username for the target
    #[arg(short, long)]
    pub username: String,

    /// Login password for the target (or SCANWRIGHT_TARGET_PASSWORD)
    #[arg(short, long, env = "SCANWRIGHT_TARGET_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for results (overrides config)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args, Clone)]
pub struct LogsArgs {
    /// Scan ID
    pub scan_id: String,

    /// Follow log output
    #[arg(short, long)]
    pub follow: bool,

    /// Number of lines to show
    #[arg(short, long, default_value = "100")]
    pub lines: usize,

    /// Results directory the scan wrote to
    #[arg(short, long, default_value = "./results")]
    pub output: String,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
