//! Error taxonomy for a sync run
//!
//! Every error is fatal to the current entity-kind run. Pages already written
//! stay written; re-running is safe because all writes are keyed upserts.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to obtain one page from the API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network, DNS, TLS or timeout failure; no HTTP status was received
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("server returned HTTP {status}")]
    ServerError { status: u16 },

    /// 2xx response whose body is not the expected JSON envelope
    #[error("invalid response body: {message}")]
    InvalidBody { message: String },
}

impl FetchError {
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status } => Some(*status),
            _ => None,
        }
    }
}

/// A raw item that cannot be projected onto its kind's field table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("item {item_index} is missing required field '{field}': {item}")]
    MissingField {
        field: &'static str,
        item_index: usize,
        item: String,
    },

    #[error("item {item_index} is not a JSON object: {item}")]
    NotAnObject { item_index: usize, item: String },
}

impl MappingError {
    pub fn item_index(&self) -> usize {
        match self {
            Self::MissingField { item_index, .. } | Self::NotAnObject { item_index, .. } => {
                *item_index
            }
        }
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        match self {
            Self::MissingField { field, item, .. } => Self::MissingField {
                field,
                item_index: index,
                item,
            },
            Self::NotAnObject { item, .. } => Self::NotAnObject {
                item_index: index,
                item,
            },
        }
    }
}

/// Batch write failure. Chunks before `chunk_index` are committed; later chunks are not attempted.
#[derive(Error, Debug)]
pub enum UpsertError {
    #[error("failed to refresh database connection: {cause}")]
    ConnectionRefresh {
        #[source]
        cause: BoxError,
    },

    #[error("upsert of chunk {chunk_index} failed after {records_written} records: {cause}")]
    Chunk {
        chunk_index: usize,
        records_written: usize,
        #[source]
        cause: BoxError,
    },
}

impl UpsertError {
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::ConnectionRefresh { .. } => None,
            Self::Chunk { chunk_index, .. } => Some(*chunk_index),
        }
    }
}

/// Coarse error category, also the process exit code taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Fetch,
    Mapping,
    Write,
    RunawayPagination,
}

impl ErrorCategory {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Fetch => 2,
            Self::Mapping => 3,
            Self::Write => 4,
            Self::RunawayPagination => 5,
        }
    }
}

/// Reason a sync run aborted
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fetching page {page} failed: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },

    #[error("mapping page {page} failed: {source}")]
    Mapping {
        page: u32,
        #[source]
        source: MappingError,
    },

    #[error("writing page {page} failed: {source}")]
    Upsert {
        page: u32,
        #[source]
        source: UpsertError,
    },

    #[error("pagination did not converge: stopped before page {next_page} after {elapsed:?}")]
    RunawayPagination { next_page: u32, elapsed: Duration },
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch { .. } => ErrorCategory::Fetch,
            Self::Mapping { .. } => ErrorCategory::Mapping,
            Self::Upsert { .. } => ErrorCategory::Write,
            Self::RunawayPagination { .. } => ErrorCategory::RunawayPagination,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }
}
