//! Infrastructure layer: HTTP, database, configuration and logging
//!
//! Concrete implementations of the domain seams ([`PageFetcher`](crate::domain::PageFetcher),
//! [`RecordStore`](crate::domain::RecordStore)) plus the ambient services they need.

pub mod config;
pub mod database_connection;
pub mod http_client;
pub mod logging;
pub mod record_repository;
pub mod retry_policy;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, ConfigManager};
pub use database_connection::DatabaseConnection;
pub use http_client::MarketplaceClient;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use record_repository::SqliteRecordStore;
pub use retry_policy::RetryPolicy;
