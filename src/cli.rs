//! CLI definitions for AutoFlow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AutoFlow CLI.
#[derive(Parser)]
#[command(name = "autoflow")]
#[command(about = "Workflow orchestration: run, monitor and schedule step pipelines")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "autoflow.toml", global = true, env = "AUTOFLOW_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run a goal through the pipeline once and print the summary
    Run {
        /// Goal description
        #[arg(short, long)]
        goal: String,

        /// Comma-separated step names (default: the full pipeline)
        #[arg(long, value_delimiter = ',')]
        steps: Vec<String>,

        /// Print the full orchestration result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Schedule a goal and stay in the foreground while it fires
    Schedule {
        /// Goal description
        #[arg(short, long)]
        goal: String,

        /// Fire every N milliseconds
        #[arg(long, conflicts_with_all = ["cron", "at"])]
        interval_ms: Option<u64>,

        /// Fire on a cron expression (5, 6 or 7 fields)
        #[arg(long, conflicts_with = "at")]
        cron: Option<String>,

        /// Fire once at an RFC 3339 timestamp
        #[arg(long)]
        at: Option<String>,

        /// Exit after this many firings (0 = until interrupted)
        #[arg(long, default_value_t = 1)]
        runs: usize,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Validate the configuration file
    Validate,

    /// Print the effective configuration as TOML
    Show,
}
