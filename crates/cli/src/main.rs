//! access-log-analyzer — command-line front end for the analytics engine.

mod boot;
mod commands;

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "access-log-analyzer", version, about = "Parse and analyse web-server access logs")]
struct Cli {
    /// Config file (defaults to $ANALYZER_CONFIG_FILE or ./analyzer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = boot::load_config(cli.config.as_deref())?;
    boot::init_logging(&config.logging);

    tracing::debug!(
        layout = %config.layout,
        workers = config.workers,
        top_n = config.top_n,
        "Configuration loaded"
    );

    commands::run(cli.command, config).await
}
