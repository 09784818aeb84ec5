//! Command-line definitions.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "breachwatch",
    version,
    about = "Look up an email address across breach data providers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search providers for an email and print the consolidated report
    Check(CheckArgs),
    /// List the available providers
    Providers,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CheckArgs {
    /// Email address to look up
    #[arg(long)]
    pub email: String,

    /// Provider to query (repeatable or comma-separated; defaults from config)
    #[arg(long = "provider", value_delimiter = ',')]
    pub providers: Vec<String>,

    /// Raw DeHashed query expression instead of `email:<email>`
    #[arg(long)]
    pub dehashed_query: Option<String>,

    /// Also fetch pastes from Have I Been Pwned
    #[arg(long)]
    pub include_pastes: bool,

    /// Also fetch the data class catalogue from Have I Been Pwned
    #[arg(long)]
    pub include_data_classes: bool,

    /// Have I Been Pwned pacing rate in queries per second
    #[arg(long)]
    pub hibp_qps: Option<f64>,

    /// Per-call HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}
