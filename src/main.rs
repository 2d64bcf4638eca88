use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vaultrefs::cli_types::Cli;
use vaultrefs::{AppConfig, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "vaultrefs=debug" } else { "vaultrefs=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    let verbose = cli.verbose || config.output.verbose;
    config.output.verbose = verbose;

    let app = CliApp::new(config, verbose);
    app.run(cli.command).await
}
