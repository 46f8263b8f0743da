// src/logging.rs

//! Logging setup for `specwatch` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. explicit level passed by the embedding tool (if provided)
//! 2. `SPECWATCH_LOG` environment variable (e.g. "info", "debug")
//! 3. `[run].log_level` from the config file
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that stdout stays free for test reports.

use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;
use tracing_subscriber::fmt;

/// Log level as exposed to embedding tools and the config file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(lvl: LogLevel) -> Self {
        match lvl {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Resolve the effective level without installing anything.
pub fn effective_level(explicit: Option<LogLevel>, configured: Option<LogLevel>) -> tracing::Level {
    explicit
        .or_else(|| {
            std::env::var("SPECWATCH_LOG")
                .ok()
                .and_then(|s| s.parse::<LogLevel>().ok())
        })
        .or(configured)
        .map(tracing::Level::from)
        .unwrap_or(tracing::Level::INFO)
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(explicit: Option<LogLevel>, configured: Option<LogLevel>) -> Result<()> {
    let level = effective_level(explicit, configured);

    // Send logs to stderr; keep stdout free for reports.
    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}
