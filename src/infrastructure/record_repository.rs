//! SQLite record store
//!
//! Each store owns one connection lease taken from the shared pool. The lease
//! is closed and replaced before every batch because a page fetch can keep the
//! job away from the database for up to the HTTP timeout, long enough for the
//! server side to drop an idle connection.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Connection, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::entity::{EntityKind, EntitySchema};
use crate::domain::errors::UpsertError;
use crate::domain::record::{FieldValue, MappedRecord};
use crate::domain::repositories::RecordStore;
use crate::infrastructure::database_connection::quote_ident;

/// Bound-parameter ceiling of a single SQLite statement
pub const SQLITE_MAX_VARIABLES: usize = 32_766;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

pub struct SqliteRecordStore {
    pool: SqlitePool,
    lease: Mutex<Option<PoolConnection<Sqlite>>>,
    chunk_size: usize,
    refreshes: AtomicUsize,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool, chunk_size: usize) -> Self {
        Self {
            pool,
            lease: Mutex::new(None),
            chunk_size: chunk_size.max(1),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Records per statement for `schema`, never above the parameter ceiling.
    pub fn effective_chunk_size(&self, schema: &EntitySchema) -> usize {
        let ceiling = (SQLITE_MAX_VARIABLES / schema.column_count()).max(1);
        self.chunk_size.min(ceiling)
    }

    /// Number of times the lease has been replaced so far.
    pub fn connection_refreshes(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Drop the current lease, if any, and acquire a fresh, pinged one.
    pub async fn refresh_connection(&self) -> Result<(), UpsertError> {
        let mut lease = self.lease.lock().await;
        let fresh = self.cycle(lease.take()).await?;
        *lease = Some(fresh);
        Ok(())
    }

    async fn cycle(
        &self,
        previous: Option<PoolConnection<Sqlite>>,
    ) -> Result<PoolConnection<Sqlite>, UpsertError> {
        if let Some(old) = previous {
            // a dead connection may fail to close cleanly; it is discarded either way
            if let Err(e) = old.close().await {
                debug!("Closing previous connection failed: {}", e);
            }
        }

        let mut conn = self.pool.acquire().await.map_err(refresh_error)?;
        conn.ping().await.map_err(refresh_error)?;
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(conn)
    }

    pub async fn count(&self, kind: EntityKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(kind.schema().table));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// All stored rows of `kind`, ordered by identity key, in schema column order.
    pub async fn fetch_rows(&self, kind: EntityKind) -> Result<Vec<Vec<FieldValue>>> {
        let schema = kind.schema();
        let columns: Vec<String> = schema.columns().map(quote_ident).collect();
        let keys: Vec<String> = schema.key_columns.iter().copied().map(quote_ident).collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            columns.join(", "),
            quote_ident(schema.table),
            keys.join(", ")
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut decoded = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let raw = row.try_get_raw(idx)?;
                let value = if raw.is_null() {
                    FieldValue::Null
                } else {
                    let type_info = raw.type_info();
                    match type_info.name() {
                        "INTEGER" => FieldValue::Int(row.try_get(idx)?),
                        "REAL" => FieldValue::Float(row.try_get(idx)?),
                        _ => FieldValue::Text(row.try_get(idx)?),
                    }
                };
                values.push(value);
            }
            decoded.push(values);
        }
        Ok(decoded)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert_batch(
        &self,
        kind: EntityKind,
        records: &[MappedRecord],
    ) -> Result<usize, UpsertError> {
        if records.is_empty() {
            return Ok(0);
        }

        let schema = kind.schema();
        let mut lease = self.lease.lock().await;
        let fresh = self.cycle(lease.take()).await?;
        let conn = lease.insert(fresh);

        let chunk_size = self.effective_chunk_size(schema);
        let mut written = 0;
        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let sql = upsert_sql(schema, chunk.len());
            let mut query = sqlx::query(&sql);
            for record in chunk {
                debug_assert_eq!(record.kind(), kind);
                for value in record.values() {
                    query = bind_value(query, value);
                }
            }

            query
                .execute(&mut **conn)
                .await
                .map_err(|e| UpsertError::Chunk {
                    chunk_index,
                    records_written: written,
                    cause: Box::new(e),
                })?;
            written += chunk.len();
        }

        debug!("Upserted {} {} records in chunks of {}", written, kind, chunk_size);
        Ok(written)
    }
}

fn refresh_error(e: sqlx::Error) -> UpsertError {
    UpsertError::ConnectionRefresh { cause: Box::new(e) }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q FieldValue) -> SqliteQuery<'q> {
    match value {
        FieldValue::Null => query.bind(None::<String>),
        FieldValue::Bool(b) => query.bind(*b),
        FieldValue::Int(i) => query.bind(*i),
        FieldValue::Float(f) => query.bind(*f),
        FieldValue::Text(s) => query.bind(s.as_str()),
    }
}

/// One multi-row insert that overwrites exactly the value columns on key conflict.
fn upsert_sql(schema: &EntitySchema, rows: usize) -> String {
    let columns: Vec<String> = schema.columns().map(quote_ident).collect();
    let keys: Vec<String> = schema.key_columns.iter().copied().map(quote_ident).collect();
    let row = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![row; rows].join(", ");

    let action = if schema.value_columns.is_empty() {
        "NOTHING".to_string()
    } else {
        let assignments: Vec<String> = schema
            .value_columns
            .iter()
            .map(|column| {
                let column = quote_ident(column);
                format!("{column} = excluded.{column}")
            })
            .collect();
        format!("UPDATE SET {}", assignments.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES {} ON CONFLICT ({}) DO {}",
        quote_ident(schema.table),
        columns.join(", "),
        values,
        keys.join(", "),
        action
    )
}
