//! Test utilities for marketplace-sync
//!
//! Scripted fakes for the two engine seams plus an isolated on-disk database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::domain::entity::EntityKind;
use crate::domain::errors::{FetchError, UpsertError};
use crate::domain::job::JobDescriptor;
use crate::domain::page::RawPage;
use crate::domain::record::MappedRecord;
use crate::domain::repositories::RecordStore;
use crate::domain::services::PageFetcher;
use crate::infrastructure::DatabaseConnection;

/// Test database in its own temporary directory.
///
/// On-disk rather than `sqlite::memory:` because the record store closes and
/// reopens connections, which would discard an in-memory database.
pub struct TestDatabase {
    pub connection: DatabaseConnection,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("sync.db").display());
        let connection = DatabaseConnection::new(&url, 8).await?;
        connection.migrate().await?;
        Ok(Self {
            connection,
            _dir: dir,
        })
    }

    pub fn pool(&self) -> sqlx::SqlitePool {
        self.connection.pool().clone()
    }
}

pub fn day(ymd: &str) -> NaiveDate {
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d").unwrap()
}

pub fn job(kind: EntityKind) -> JobDescriptor {
    JobDescriptor::new(
        kind,
        "http://marketplace.test/api",
        "test-key",
        day("2026-02-10"),
        day("2026-03-01"),
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

/// Serves pages from a script; an exhausted script serves empty pages.
pub struct ScriptedFetcher {
    pages: Mutex<VecDeque<Result<RawPage, FetchError>>>,
    requested: Mutex<Vec<u32>>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<Result<RawPage, FetchError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requested: Mutex::new(Vec::new()),
        }
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

/// Records every batch it is handed
#[derive(Default)]
pub struct RecordingStore {
    batches: Mutex<Vec<(EntityKind, Vec<MappedRecord>)>>,
}

impl RecordingStore {
    pub fn batches(&self) -> Vec<(EntityKind, Vec<MappedRecord>)> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn upsert_batch(
        &self,
        kind: EntityKind,
        records: &[MappedRecord],
    ) -> Result<usize, UpsertError> {
        self.batches.lock().unwrap().push((kind, records.to_vec()));
        Ok(records.len())
    }
}
