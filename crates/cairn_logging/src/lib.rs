//! Shared logging utilities for Cairn binaries.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "cairn=info";
const VERBOSE_LOG_FILTER: &str = "cairn=debug";

/// Logging configuration shared by Cairn binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Also append logs to `<logs_dir>/<app_name>.log`
    pub log_to_file: bool,
}

/// Initialize tracing with stderr output and an optional log file.
///
/// `RUST_LOG` overrides the default filter for both outputs.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let console_filter = console_filter(config.verbose);

    let file_layer = if config.log_to_file {
        let path = log_file_path(config.app_name)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(default_filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn console_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        default_filter()
    }
}

/// Get the Cairn home directory: `$CAIRN_HOME` or `~/.cairn`
pub fn cairn_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("CAIRN_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    dirs::home_dir()
        .map(|home| home.join(".cairn"))
        .context("Could not determine home directory")
}

/// Get the logs directory: `<cairn_home>/logs`
pub fn logs_dir() -> Result<PathBuf> {
    Ok(cairn_home()?.join("logs"))
}

/// Ensure the logs directory exists and return the log file for `app_name`.
pub fn log_file_path(app_name: &str) -> Result<PathBuf> {
    let logs = logs_dir()?;
    fs::create_dir_all(&logs)
        .with_context(|| format!("Failed to create logs directory: {}", logs.display()))?;
    Ok(logs.join(format!("{}.log", sanitize_name(app_name))))
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect()
}
