//! File-only tracing setup. The terminal belongs to the UI, so nothing is
//! ever written to stdout or stderr once the subscriber is installed.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;
use crate::error::{AppError, Result};

/// Environment variable holding a filter directive, e.g. `MES_LOG=debug`.
pub const LOG_ENV: &str = "MES_LOG";
const LOG_FILE_PREFIX: &str = "mes.log";

/// `<state dir>/mes`, falling back to the cache dir, then the temp dir.
pub fn log_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("mes")
}

/// Filter from the env directive when set, else the configured level.
pub fn build_filter(env_directive: Option<&str>, level: &str) -> Result<EnvFilter> {
    let directive = env_directive
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("invalid log filter '{}': {}", directive, e)))
}

/// Install the global subscriber writing to a daily rolling file.
///
/// Returns `None` when logging is disabled. The guard must live until exit
/// so buffered lines are flushed.
pub fn init(config: &AppConfig) -> Result<Option<WorkerGuard>> {
    if !config.logging_enabled() {
        return Ok(None);
    }

    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(env.as_deref(), config.log_level())?;

    let dir = log_dir();
    std::fs::create_dir_all(&dir)?;
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|e| AppError::Config(format!("logging already initialised: {}", e)))?;

    tracing::info!(dir = %dir.display(), version = env!("CARGO_PKG_VERSION"), "logging started");
    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_is_namespaced() {
        assert!(log_dir().ends_with("mes"));
    }

    #[test]
    fn env_directive_wins_over_level() {
        let filter = build_filter(Some("debug"), "info").unwrap();
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn blank_env_directive_falls_back() {
        let filter = build_filter(Some("  "), "warn").unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let config: AppConfig = toml::from_str("[logging]\nenabled = false\n").unwrap();
        assert!(init(&config).unwrap().is_none());
    }
}
