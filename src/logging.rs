// src/logging.rs

//! Logging setup for `ffdrive` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. explicit level passed by the host program (if provided)
//! 2. `FFDRIVE_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Host programs that already install their own subscriber should skip
//! this and just depend on `tracing`; all library output goes through
//! `tracing` macros.

use anyhow::anyhow;
use tracing_subscriber::fmt;

use crate::errors::Result;

/// Initialise a global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: Option<tracing::Level>) -> Result<()> {
    let level = match level {
        Some(lvl) => lvl,
        None => std::env::var("FFDRIVE_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
