//! AutoFlow - workflow orchestration runtime
//!
//! Main entry point for the AutoFlow CLI.

mod adapters;
mod cli;
mod cmd_config;
mod cmd_run;
mod cmd_schedule;
mod register;
mod steps;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use autoflow_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands};
use crate::cmd_schedule::ScheduleArgs;

/// Initialize tracing with console output and, when a log directory is
/// configured, a daily-rotated file.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.directory {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("autoflow")
                .filename_suffix("log")
                .max_log_files(30)
                .build(log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            // The guard flushes on drop; keep it for the life of the process.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Run { goal, steps, json } => {
            cmd_run::handle_run(&config, goal, steps, json).await
        }
        Commands::Schedule {
            goal,
            interval_ms,
            cron,
            at,
            runs,
        } => {
            let args = ScheduleArgs {
                goal,
                interval_ms,
                cron,
                at,
                runs,
            };
            cmd_schedule::handle_schedule(&config, args).await
        }
        Commands::Config { action } => cmd_config::handle_config_command(&config, action),
    }
}
