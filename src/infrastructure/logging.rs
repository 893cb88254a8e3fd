//! Logging system configuration and initialization
//!
//! - Console output with local timestamps
//! - Optional daily-rolling file output (non-blocking writer)
//! - Optional JSON formatting
//! - `RUST_LOG` overrides the configured level entirely

#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    filter::Directive,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the file writer flushing for the lifetime of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Local-time timestamp formatter
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Build the filter: `RUST_LOG` if set, else the configured level with
/// dependency noise suppressed unless the level is `trace`.
///
/// ```bash
/// # Show every SQL statement
/// RUST_LOG="debug,sqlx::query=debug" marketplace-sync sync sales
/// ```
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![config.level.clone()];
    if !config.level.to_lowercase().contains("trace") {
        directives.extend(
            [
                "sqlx::query=warn",
                "sqlx::sqlite=warn",
                "reqwest=info",
                "hyper=warn",
                "hyper_util=warn",
                "h2=warn",
                "rustls=warn",
            ]
            .map(str::to_string),
        );
    }
    directives.extend(
        config
            .module_filters
            .iter()
            .map(|(module, level)| format!("{}={}", module, level)),
    );

    let mut filter = EnvFilter::new("");
    for directive in directives {
        let parsed = directive
            .parse::<Directive>()
            .map_err(|e| anyhow!("Invalid log directive '{}': {}", directive, e))?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let file_layer = if config.file_output {
        let log_dir = config.log_dir.clone().unwrap_or_else(get_log_directory);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        let (file_writer, guard) = non_blocking(rolling::daily(&log_dir, &config.file_prefix));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);

        let layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        Some(if config.json_format {
            layer
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            layer.with_target(false).boxed()
        })
    } else {
        None
    };

    let console_layer = if config.console_output {
        let layer = fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_timer(LocalTimeFormatter)
            .with_target(false);
        Some(if config.json_format {
            layer.json().boxed()
        } else {
            layer.boxed()
        })
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Logging initialized (level: {})", config.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_accepts_module_overrides() {
        let config = LoggingConfig {
            level: "debug".into(),
            module_filters: HashMap::from([("sqlx".to_string(), "error".to_string())]),
            ..LoggingConfig::default()
        };
        let filter = build_env_filter(&config).unwrap();
        let rendered = filter.to_string();
        if std::env::var("RUST_LOG").is_err() {
            assert!(rendered.contains("sqlx=error"));
            assert!(rendered.contains("hyper=warn"));
        }
    }

    #[test]
    fn test_invalid_directive_is_an_error() {
        let config = LoggingConfig {
            level: "info".into(),
            module_filters: HashMap::from([("sqlx".to_string(), "loud".to_string())]),
            ..LoggingConfig::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            assert!(build_env_filter(&config).is_err());
        }
    }

    #[test]
    fn test_log_directory_is_named_logs() {
        assert!(get_log_directory().ends_with("logs"));
    }
}
