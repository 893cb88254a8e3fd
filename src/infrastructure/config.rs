//! Configuration infrastructure
//!
//! Settings are layered, lowest precedence first:
//! 1. Built-in defaults (see [`defaults`])
//! 2. An optional config file (`--config <path>` or `<config_dir>/marketplace-sync/config.{toml,json,yaml}`)
//! 3. Environment variables prefixed `WB_`, nested with `__` (e.g. `WB_SYNC__CHUNK_SIZE=20`)
//! 4. The flat `WB_API_URL` / `WB_API_KEY` variables used by existing deployments

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::entity::EntityKind;
use crate::domain::job::JobDescriptor;
use crate::infrastructure::retry_policy::RetryPolicy;

const ENV_PREFIX: &str = "WB";
const LEGACY_API_URL_VAR: &str = "WB_API_URL";
const LEGACY_API_KEY_VAR: &str = "WB_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to locate configuration directory")]
    NoConfigDir,
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub sync: SyncSettings,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

/// Upstream marketplace API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; the entity endpoint is appended as a path segment
    pub base_url: String,
    pub api_key: String,
    /// Records requested per page (`limit`)
    pub page_size: u32,
    pub timeout_seconds: u64,
    /// Skip TLS certificate verification. The upstream host has historically
    /// served an unverifiable certificate; turning this on exposes the API key
    /// to interception.
    pub accept_invalid_certs: bool,
    pub headers: ClientHeaders,
}

/// Request headers sent with every page request.
///
/// The defaults mimic a common API tool because the upstream filters some
/// client signatures; change them here if that filtering changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientHeaders {
    pub user_agent: String,
    pub accept: String,
    pub cache_control: String,
    pub accept_encoding: String,
    pub connection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:data/marketplace.db`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// `dateFrom` for incomes, orders and sales. Every run re-walks from here.
    pub start_date: NaiveDate,
    /// Records per upsert statement
    pub chunk_size: usize,
    /// Hard cap on pages fetched per run
    pub max_pages: u32,
    /// Optional wall-clock cap per run
    pub max_elapsed_seconds: Option<u64>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    /// Enable JSON formatted logs
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,
    /// File name prefix for the daily rolling log file
    pub file_prefix: String,
    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

/// Default configuration values
pub mod defaults {
    pub const PAGE_SIZE: u32 = 100;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const CHUNK_SIZE: usize = 10;
    pub const MAX_PAGES: u32 = 10_000;
    pub const MAX_DB_CONNECTIONS: u32 = 5;
    pub const DATABASE_URL: &str = "sqlite:marketplace_sync.db";
    /// (year, month, day) of the historical backfill start
    pub const START_DATE: (i32, u32, u32) = (2026, 2, 10);

    pub const USER_AGENT: &str = "PostmanRuntime/7.51.1";
    pub const ACCEPT: &str = "*/*";
    pub const CACHE_CONTROL: &str = "no-cache";
    pub const ACCEPT_ENCODING: &str = "gzip, deflate, br";
    pub const CONNECTION: &str = "keep-alive";
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            page_size: defaults::PAGE_SIZE,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            accept_invalid_certs: true,
            headers: ClientHeaders::default(),
        }
    }
}

impl Default for ClientHeaders {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            accept: defaults::ACCEPT.to_string(),
            cache_control: defaults::CACHE_CONTROL.to_string(),
            accept_encoding: defaults::ACCEPT_ENCODING.to_string(),
            connection: defaults::CONNECTION.to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::MAX_DB_CONNECTIONS,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        let (y, m, d) = defaults::START_DATE;
        Self {
            start_date: NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default(),
            chunk_size: defaults::CHUNK_SIZE,
            max_pages: defaults::MAX_PAGES,
            max_elapsed_seconds: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: None,
            file_prefix: "marketplace-sync.log".to_string(),
            module_filters: HashMap::new(),
        }
    }
}

impl SyncSettings {
    pub fn max_elapsed(&self) -> Option<Duration> {
        self.max_elapsed_seconds.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Check settings every command depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.chunk_size == 0 {
            return Err(ConfigError::validation("sync.chunk_size must be greater than 0"));
        }
        if self.sync.max_pages == 0 {
            return Err(ConfigError::validation("sync.max_pages must be greater than 0"));
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::validation("api.page_size must be greater than 0"));
        }
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::validation("api.timeout_seconds must be greater than 0"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections must be greater than 0",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::validation("retry.max_attempts must be greater than 0"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::validation(
                "retry.base_delay_ms cannot be greater than retry.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Check the API credentials; only needed by sync commands.
    pub fn validate_api(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::validation(format!(
                "api.base_url is not set (set {LEGACY_API_URL_VAR})"
            )));
        }
        url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::validation(format!("api.base_url '{}' is invalid: {e}", self.api.base_url))
        })?;
        if self.api.api_key.trim().is_empty() {
            return Err(ConfigError::validation(format!(
                "api.api_key is not set (set {LEGACY_API_KEY_VAR})"
            )));
        }
        Ok(())
    }

    /// Build the immutable job value for one run of `kind` on day `today`.
    pub fn job_descriptor(&self, kind: EntityKind, today: NaiveDate) -> JobDescriptor {
        JobDescriptor::new(
            kind,
            &self.api.base_url,
            &self.api.api_key,
            self.sync.start_date,
            today,
            self.api.page_size,
        )
    }
}

/// Configuration loader
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("marketplace-sync"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// `config_path` overrides the default `<config_dir>/marketplace-sync/config.*` lookup
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load from all sources using the process environment
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with_env(std::env::vars().collect())
    }

    /// Load from all sources, reading environment variables from `env`
    pub fn load_with_env(&self, env: HashMap<String, String>) -> Result<AppConfig, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = &self.config_path {
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        } else if let Ok(dir) = Self::get_config_dir() {
            let default_path = dir.join("config");
            debug!("Looking for optional configuration at: {:?}", default_path);
            builder = builder.add_source(
                config::File::with_name(&default_path.to_string_lossy()).required(false),
            );
        }

        let legacy_url = env.get(LEGACY_API_URL_VAR).cloned();
        let legacy_key = env.get(LEGACY_API_KEY_VAR).cloned();

        builder = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env)),
            )
            .set_override_option("api.base_url", legacy_url)?
            .set_override_option("api.api_key", legacy_key)?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
