//! CLI definitions for CronHands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CronHands CLI.
#[derive(Parser)]
#[command(name = "cronhands")]
#[command(about = "Attribute-driven cron job engine")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the engine with the bundled jobs until interrupted (default)
    Run {
        /// Namespace to scan, in addition to the configured ones
        #[arg(short, long = "namespace")]
        namespaces: Vec<String>,

        /// Stop after this many seconds instead of waiting for ctrl-c
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Register jobs and print the resulting schedule
    List {
        /// Namespace to scan, in addition to the configured ones
        #[arg(short, long = "namespace")]
        namespaces: Vec<String>,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Load and validate the configuration file
    CheckConfig,
}
