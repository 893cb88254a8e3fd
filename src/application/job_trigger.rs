//! Job trigger: builds the engine from configuration and runs entity kinds
//!
//! Every run gets its own [`SqliteRecordStore`], and with it its own
//! connection lease, so concurrently running kinds never cycle each other's
//! connection. The HTTP client is stateless and shared.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

use crate::application::sync_orchestrator::{SyncLimits, SyncOrchestrator};
use crate::domain::entity::EntityKind;
use crate::domain::report::SyncReport;
use crate::domain::services::PageFetcher;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::database_connection::DatabaseConnection;
use crate::infrastructure::http_client::MarketplaceClient;
use crate::infrastructure::record_repository::SqliteRecordStore;

pub struct SyncRunner {
    config: AppConfig,
    fetcher: Arc<dyn PageFetcher>,
    pool: SqlitePool,
}

impl SyncRunner {
    /// Connect to the API and database described by `config`. Tables are created if missing.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        config.validate_api()?;

        let fetcher = MarketplaceClient::from_api_config(&config.api, config.retry.clone())?;
        let db = DatabaseConnection::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to the record database")?;
        db.migrate().await?;

        Ok(Self::new(config, Arc::new(fetcher), db.pool().clone()))
    }

    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>, pool: SqlitePool) -> Self {
        Self {
            config,
            fetcher,
            pool,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn orchestrator(&self) -> SyncOrchestrator {
        let store = SqliteRecordStore::new(self.pool.clone(), self.config.sync.chunk_size);
        SyncOrchestrator::new(
            self.fetcher.clone(),
            Arc::new(store),
            SyncLimits::from_settings(&self.config.sync),
        )
    }

    /// Sync one entity kind as of calendar day `today`.
    pub async fn run(&self, kind: EntityKind, today: NaiveDate) -> SyncReport {
        let job = self.config.job_descriptor(kind, today);
        self.orchestrator().run(&job).await
    }

    /// Sync all four kinds concurrently. Reports come back in [`EntityKind::ALL`] order.
    pub async fn run_all(&self, today: NaiveDate) -> Vec<SyncReport> {
        info!("Syncing all entity kinds as of {}", today);
        join_all(EntityKind::ALL.map(|kind| self.run(kind, today))).await
    }
}

/// Exit code of the first failed report in `reports`, else 0.
pub fn exit_code(reports: &[SyncReport]) -> u8 {
    reports
        .iter()
        .map(SyncReport::exit_code)
        .find(|code| *code != 0)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FetchError;
    use crate::domain::page::RawPage;
    use crate::test_utils::{ScriptedFetcher, TestDatabase, day, raw_item};

    fn config(chunk_size: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.api.base_url = "http://marketplace.test/api".into();
        config.api.api_key = "test-key".into();
        config.sync.chunk_size = chunk_size;
        config
    }

    #[tokio::test]
    async fn test_run_writes_through_to_sqlite() {
        let db = TestDatabase::new().await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(RawPage::new(
            (1..=25).map(|n| raw_item(EntityKind::Orders, n)).collect(),
            Some(1),
        ))]));
        let runner = SyncRunner::new(config(10), fetcher, db.pool());

        let report = runner.run(EntityKind::Orders, day("2026-03-01")).await;

        assert!(report.is_success());
        assert_eq!(report.progress.records_written, 25);
        let store = SqliteRecordStore::new(db.pool(), 10);
        assert_eq!(store.count(EntityKind::Orders).await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_run_all_reports_every_kind_in_order() {
        let db = TestDatabase::new().await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let runner = SyncRunner::new(config(10), fetcher.clone(), db.pool());

        let reports = runner.run_all(day("2026-03-01")).await;

        let kinds: Vec<_> = reports.iter().map(|r| r.entity).collect();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
        assert_eq!(fetcher.requested_pages(), vec![1, 1, 1, 1]);
        assert_eq!(exit_code(&reports), 0);
    }

    #[tokio::test]
    async fn test_exit_code_is_first_failure() {
        let db = TestDatabase::new().await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(FetchError::connection_failed(
            "refused",
        ))]));
        let runner = SyncRunner::new(config(10), fetcher, db.pool());

        let failed = runner.run(EntityKind::Sales, day("2026-03-01")).await;
        let ok = runner.run(EntityKind::Stocks, day("2026-03-01")).await;

        assert_eq!(exit_code(&[ok.clone(), failed.clone()]), 2);
        assert_eq!(exit_code(&[ok]), 0);
    }
}
