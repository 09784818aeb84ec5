use breachwatch_cli::cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    breachwatch_cli::init_tracing(cli.verbose);
    breachwatch_cli::run(cli).await
}
