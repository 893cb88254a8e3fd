//! Service interfaces the sync engine depends on

use async_trait::async_trait;

use crate::domain::errors::FetchError;
use crate::domain::job::JobDescriptor;
use crate::domain::page::RawPage;

/// Retrieves one page of raw records for a job
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, job: &JobDescriptor, page: u32) -> Result<RawPage, FetchError>;
}
