use std::path::PathBuf;

use analytics::config::{Config, DEFAULT_CONFIG_PATH};
use analytics::{Logger, LoggingFacade, Severity};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser)]
#[command(name = "analytics", version, about = "Receive metadata for analytics")]
struct Cli {
    /// Verbose mode
    #[arg(long)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("load config {}", cli.config.display()))?;
    let options = config.log_options().context("read [Logging] section")?;

    let facade = LoggingFacade::new();
    let logger = facade.initialize(&options).context("initialize logging")?;

    if cli.verbose {
        enable_verbose(&logger);
    }
    tracing::debug!(sections = ?config.section_names(), "configuration loaded");
    Ok(())
}

/// Lowers the logger and every sink to DEBUG.
fn enable_verbose(logger: &Logger) {
    logger.set_level_all(Severity::DEBUG);
    tracing::info!("Updated logger level to: {}", Severity::DEBUG);
}
