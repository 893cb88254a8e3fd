//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use marketplace_sync_lib::application::{SyncLimits, SyncOrchestrator};
use marketplace_sync_lib::domain::{
    EntityKind, FetchError, JobDescriptor, PageFetcher, RawPage, SyncReport,
};
use marketplace_sync_lib::infrastructure::{DatabaseConnection, SqliteRecordStore};

pub fn day(ymd: &str) -> NaiveDate {
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d").unwrap()
}

pub fn job(kind: EntityKind, today: &str) -> JobDescriptor {
    JobDescriptor::new(
        kind,
        "http://marketplace.test/api",
        "test-key",
        day("2026-02-10"),
        day(today),
        100,
    )
}

/// A complete raw item for `kind`; `n` makes the identity key unique.
pub fn raw_item(kind: EntityKind, n: i64) -> Value {
    let mut item = Map::new();
    for column in kind.schema().columns() {
        let value = match column {
            "date" => json!("2026-02-10"),
            c if c.ends_with("_id") || c == "odid" || c == "quantity" => json!(n),
            c if c.contains("price") || c == "spp" || c == "for_pay" => json!(n as f64 + 0.5),
            c if c.starts_with("is_") => json!(false),
            c => json!(format!("{c}-{n}")),
        };
        item.insert(column.to_string(), value);
    }
    Value::Object(item)
}

pub fn income(income_id: i64, barcode: &str) -> Value {
    let mut item = raw_item(EntityKind::Incomes, income_id);
    item["barcode"] = json!(barcode);
    item
}

pub fn stock(date: &str, warehouse_name: &str, nm_id: i64, quantity: i64) -> Value {
    let mut item = raw_item(EntityKind::Stocks, nm_id);
    item["date"] = json!(date);
    item["warehouse_name"] = json!(warehouse_name);
    item["quantity"] = json!(quantity);
    item
}

pub fn page(items: Vec<Value>, last_page: i64) -> Result<RawPage, FetchError> {
    Ok(RawPage::new(items, Some(last_page)))
}

/// Serves pages from a script; an exhausted script serves empty pages.
pub struct ScriptedFetcher {
    pages: Mutex<VecDeque<Result<RawPage, FetchError>>>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<Result<RawPage, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, _job: &JobDescriptor, page: u32) -> Result<RawPage, FetchError> {
        self.requested.lock().unwrap().push(page);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawPage::default()))
    }
}

/// Migrated SQLite database living in a temporary directory
pub struct TestDb {
    pub db: DatabaseConnection,
    _dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("sync.db").display());
        let db = DatabaseConnection::new(&url, 8).await.unwrap();
        db.migrate().await.unwrap();
        Self { db, _dir: dir }
    }

    pub fn store(&self, chunk_size: usize) -> Arc<SqliteRecordStore> {
        Arc::new(SqliteRecordStore::new(self.db.pool().clone(), chunk_size))
    }
}

/// Run `job` through the real store with the given script.
pub async fn sync(
    store: &Arc<SqliteRecordStore>,
    script: Vec<Result<RawPage, FetchError>>,
    job: &JobDescriptor,
) -> (SyncReport, Arc<ScriptedFetcher>) {
    let fetcher = ScriptedFetcher::new(script);
    let report = SyncOrchestrator::new(fetcher.clone(), store.clone(), SyncLimits::default())
        .run(job)
        .await;
    (report, fetcher)
}
