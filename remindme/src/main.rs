// RemindMe - personal reminder tracker
// Entry point: logging, argument parsing and process lifetime

use anyhow::Context;
use clap::Parser;
use remindme::app::{self, AlertBackend};
use remindme::commands::{self, Command};
use remindme::config::{DATA_DIR_NAME, DEFAULT_LOG_FILTER};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "remindme", version, about = "Timed reminders with local notifications")]
struct Cli {
    /// Directory holding the database and settings
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .context("Could not determine a data directory; pass --data-dir")?
            .join(DATA_DIR_NAME),
    };

    if cli.command.is_long_running() {
        tracing::info!("Starting RemindMe");
        let (state, events) = app::setup(&data_dir, AlertBackend::Local).await?;

        state
            .run_until(events, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .await?;
        return Ok(());
    }

    let (state, _events) = app::setup(&data_dir, AlertBackend::Memory).await?;
    commands::dispatch(&state, cli.command).await?;

    Ok(())
}
