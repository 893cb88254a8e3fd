//! Domain module - entity schemas, records and the contracts of the sync engine
//!
//! Public exports are defined here for convenience.

pub mod entity;
pub mod errors;
pub mod job;
pub mod page;
pub mod record;
pub mod report;
pub mod repositories;
pub mod services;

pub use entity::{EntityKind, EntitySchema};
pub use errors::{ErrorCategory, FetchError, MappingError, SyncError, UpsertError};
pub use job::JobDescriptor;
pub use page::RawPage;
pub use record::{FieldValue, MappedRecord};
pub use report::{StopReason, SyncOutcome, SyncProgress, SyncReport};
pub use repositories::RecordStore;
pub use services::PageFetcher;
