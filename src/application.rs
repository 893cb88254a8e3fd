//! Application layer module
//!
//! Record mapping, the pagination driver and the job trigger that wires
//! them to configuration.

pub mod job_trigger;
pub mod mapper;
pub mod sync_orchestrator;

pub use job_trigger::{SyncRunner, exit_code};
pub use mapper::{map_item, map_page};
pub use sync_orchestrator::{SyncLimits, SyncOrchestrator};
