//! Breachwatch command-line shell.
//!
//! This is the thin application shell that parses arguments, sources
//! credentials from the environment and prints reports. Core logic lives in
//! the `crates/` directory.

pub mod cli;
pub mod commands;

use cli::{Cli, Command};
use tracing::info;

/// Initialize tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise `-v` flags raise the default level. Logs go to
/// stderr so stdout stays clean JSON.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = match verbose {
        0 => "info,breachwatch=debug",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting breachwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check(args) => {
            let report = commands::check(&args, &config, |key| std::env::var(key).ok()).await?;
            commands::write_report(&report, args.output.as_deref())?;
        }
        Command::Providers => {
            for name in commands::provider_names(&config) {
                println!("{name}");
            }
        }
    }

    Ok(())
}
