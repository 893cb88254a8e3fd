//! marketplace-sync - marketplace statistics API to SQLite synchronisation
//!
//! Pulls paginated incomes, orders, sales and stock snapshots and keeps a
//! local store eventually consistent with upstream through keyed upserts.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_utils;
