//! CronHands - Attribute-driven cron job engine
//!
//! Main entry point for the CronHands CLI.

mod cli;
mod demo;
mod report;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cronhands_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use cronhands_core::{Engine, EngineBuilder};

use cli::{Cli, Commands};

/// Keeps the file writer flushing for the program duration.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Per-user configuration file, used when the `--config` path does not exist.
fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cronhands").join("config.toml"))
}

/// Load the first existing file of `explicit` and `fallback`, or defaults.
fn load_config(explicit: &Path, fallback: Option<PathBuf>) -> anyhow::Result<(Config, PathBuf)> {
    let path = if explicit.exists() {
        explicit.to_path_buf()
    } else {
        fallback
            .filter(|p| p.exists())
            .unwrap_or_else(|| explicit.to_path_buf())
    };
    let config = ConfigLoader::load_or_default(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok((config, path))
}

/// Initialize tracing with console output and, if configured, daily
/// rotated log files.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let file_layer = match &logging.directory {
        Some(dir) => {
            let log_dir = PathBuf::from(ConfigLoader::expand_path(dir));
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(logging.file_prefix.as_str())
                .filename_suffix("log")
                .max_log_files(logging.max_files)
                .build(&log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let _ = LOG_GUARD.set(guard);
            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log level '{}'", logging.level))?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

/// Namespaces from the command line, then the config; `demo` when both are empty.
fn namespaces_to_scan(cli: Vec<String>, config: &Config) -> Vec<String> {
    let mut namespaces = cli;
    for ns in &config.scan.namespaces {
        if !namespaces.contains(ns) {
            namespaces.push(ns.clone());
        }
    }
    if namespaces.is_empty() {
        namespaces.push(demo::NAMESPACE.to_string());
    }
    namespaces
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(&cli.config, user_config_path())?;

    init_tracing(&config.logging)?;

    match cli.command {
        None => run(config, Vec::new(), None).await,
        Some(Commands::Run {
            namespaces,
            duration_secs,
        }) => run(config, namespaces, duration_secs).await,
        Some(Commands::List { namespaces, format }) => list(config, namespaces, &format).await,
        Some(Commands::CheckConfig) => check_config(&config, &config_path),
    }
}

/// Run the engine until ctrl-c or the duration elapses.
async fn run(
    config: Config,
    namespaces: Vec<String>,
    duration_secs: Option<u64>,
) -> anyhow::Result<()> {
    info!("Starting CronHands v{}", env!("CARGO_PKG_VERSION"));
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!(field = %warning.path, "{}", warning.message);
    }

    demo::register();
    let namespaces = namespaces_to_scan(namespaces, &config);
    let builder = EngineBuilder::from_config(&Config {
        scan: Default::default(),
        ..config
    })
    .namespaces(namespaces);
    let engine = Engine::init_global(builder).await?;
    info!(namespaces = ?engine.scanned_namespaces(), "Engine running, press ctrl-c to stop");

    match duration_secs {
        Some(secs) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => result?,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutting down");
    engine.shutdown().await;
    println!("{}", report::health_report(engine.stats()));
    Ok(())
}

/// Register jobs, print the schedule, shut down.
async fn list(config: Config, namespaces: Vec<String>, format: &str) -> anyhow::Result<()> {
    if !matches!(format, "table" | "json") {
        bail!("unknown format '{}', expected table or json", format);
    }

    demo::register();
    let namespaces = namespaces_to_scan(namespaces, &config);
    let engine = EngineBuilder::from_config(&Config {
        scan: Default::default(),
        ..config
    })
    .start()
    .await?;
    let registration = engine.scan_namespaces(&namespaces).await;
    for (key, reason) in &registration.failed {
        warn!(job = %key, "{}", reason);
    }

    let jobs = engine.list_scheduled_jobs().await;
    engine.shutdown().await;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&jobs)?),
        _ => print!("{}", report::schedule_table(&jobs)),
    }
    Ok(())
}

/// Validate the loaded configuration and print the findings.
fn check_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    println!("Configuration: {}", path.display());
    for warning in &result.warnings {
        println!("  warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("  error:   {}: {}", error.path, error.message);
    }
    if !result.is_valid() {
        bail!("configuration has {} error(s)", result.errors.len());
    }
    println!("Configuration is valid.");
    Ok(())
}
