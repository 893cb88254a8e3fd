//! Repository interface for synced records
//!
//! The engine only sees this trait; the SQL underneath lives in the
//! infrastructure layer.

use async_trait::async_trait;

use crate::domain::entity::EntityKind;
use crate::domain::errors::UpsertError;
use crate::domain::record::MappedRecord;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert-or-update `records` keyed by `kind`'s identity key.
    ///
    /// Returns the number of records applied. Implementations refresh their
    /// connection before writing and stop at the first failed chunk.
    async fn upsert_batch(
        &self,
        kind: EntityKind,
        records: &[MappedRecord],
    ) -> Result<usize, UpsertError>;
}
