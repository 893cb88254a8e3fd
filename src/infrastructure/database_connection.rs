// Database connection and pool management
// This module handles SQLite database connections using sqlx

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::domain::entity::{EntityKind, EntitySchema};

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        // Create database file directory if it doesn't exist
        if let Some(parent) = database_file(database_url).and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {database_url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the four record tables if absent.
    pub async fn migrate(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            sqlx::query(&create_table_sql(schema))
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create table {}", schema.table))?;
        }
        info!("Database schema is up to date");
        Ok(())
    }
}

/// Filesystem path behind a `sqlite:` URL, `None` for in-memory databases.
fn database_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Columns carry no declared type so every JSON scalar is stored as received.
fn create_table_sql(schema: &EntitySchema) -> String {
    let columns: Vec<String> = schema.columns().map(quote_ident).collect();
    let keys: Vec<String> = schema.key_columns.iter().copied().map(quote_ident).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}, UNIQUE ({}))",
        quote_ident(schema.table),
        columns.join(", "),
        keys.join(", ")
    )
}
