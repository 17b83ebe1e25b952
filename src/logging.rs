// src/logging.rs

//! Logging setup for `sitewright` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `SITEWRIGHT_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout is reserved for `--list` and `--dry-run`
//! output.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is not given.
pub const LOG_ENV: &str = "SITEWRIGHT_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_level = std::env::var(LOG_ENV).ok();
    let level = resolve_level(cli_level, env_level.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// `--log-level`, then the environment value, then `info`.
fn resolve_level(cli_level: Option<LogLevel>, env_level: Option<&str>) -> tracing::Level {
    match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => env_level
            .and_then(parse_level_str)
            .unwrap_or(tracing::Level::INFO),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_environment() {
        assert_eq!(resolve_level(Some(LogLevel::Warn), Some("trace")), tracing::Level::WARN);
        assert_eq!(resolve_level(None, Some(" Debug ")), tracing::Level::DEBUG);
        assert_eq!(resolve_level(None, Some("loud")), tracing::Level::INFO);
        assert_eq!(resolve_level(None, None), tracing::Level::INFO);
    }
}
