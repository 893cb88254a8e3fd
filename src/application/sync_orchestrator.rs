//! Pagination driver
//!
//! One [`SyncOrchestrator::run`] walks one entity kind from page 1 until an
//! empty page or the declared last page, strictly one page at a time:
//!
//! ```text
//! Fetching --empty--> Done
//!    |  ^
//!    v  | page <= last_page
//! Mapping --> Writing --page > last_page--> Done
//!
//! any error, or the page/time cap --> Aborted
//! ```
//!
//! Pages written before an abort stay written.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::application::mapper::map_page;
use crate::domain::errors::SyncError;
use crate::domain::job::JobDescriptor;
use crate::domain::page::RawPage;
use crate::domain::record::MappedRecord;
use crate::domain::report::{StopReason, SyncProgress, SyncReport};
use crate::domain::repositories::RecordStore;
use crate::domain::services::PageFetcher;
use crate::infrastructure::config::{SyncSettings, defaults};

/// Caps that turn a non-converging `last_page` into an error instead of an endless loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLimits {
    /// Highest page number that may be requested
    pub max_pages: u32,
    pub max_elapsed: Option<Duration>,
}

impl Default for SyncLimits {
    fn default() -> Self {
        Self {
            max_pages: defaults::MAX_PAGES,
            max_elapsed: None,
        }
    }
}

impl SyncLimits {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            max_pages: settings.max_pages,
            max_elapsed: settings.max_elapsed(),
        }
    }
}

enum SyncState {
    Fetching {
        page: u32,
    },
    Mapping {
        page: u32,
        raw: RawPage,
    },
    Writing {
        page: u32,
        records: Vec<MappedRecord>,
        last_page: i64,
    },
    Done(StopReason),
    Aborted(SyncError),
}

pub struct SyncOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn RecordStore>,
    limits: SyncLimits,
}

impl SyncOrchestrator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, store: Arc<dyn RecordStore>, limits: SyncLimits) -> Self {
        Self {
            fetcher,
            store,
            limits,
        }
    }

    /// Run `job` to completion. Failures are reported in the returned report, never panicked on.
    pub async fn run(&self, job: &JobDescriptor) -> SyncReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut progress = SyncProgress::default();

        info!(
            "🚀 Starting {} sync (dateFrom={}, dateTo={})",
            job.kind, job.date_from, job.date_to
        );

        let mut state = SyncState::Fetching { page: 1 };
        let result = loop {
            state = match state {
                SyncState::Fetching { page } => self.fetch(job, page, clock, &mut progress).await,
                SyncState::Mapping { page, raw } => match map_page(job.kind, raw.items()) {
                    Ok(records) => SyncState::Writing {
                        page,
                        records,
                        last_page: raw.last_page(),
                    },
                    Err(source) => SyncState::Aborted(SyncError::Mapping { page, source }),
                },
                SyncState::Writing {
                    page,
                    records,
                    last_page,
                } => self.write(job, page, &records, last_page, &mut progress).await,
                SyncState::Done(reason) => break Ok(reason),
                SyncState::Aborted(err) => break Err(err),
            };
        };

        match &result {
            Ok(reason) => info!(
                "✅ {} sync finished ({:?}): {} pages, {} records in {:.1?}",
                job.kind,
                reason,
                progress.pages_processed,
                progress.records_written,
                clock.elapsed()
            ),
            Err(e) => error!(
                "❌ {} sync aborted after {} pages: {}",
                job.kind, progress.pages_processed, e
            ),
        }

        SyncReport::new(job, started_at, progress, &result)
    }

    async fn fetch(
        &self,
        job: &JobDescriptor,
        page: u32,
        clock: Instant,
        progress: &mut SyncProgress,
    ) -> SyncState {
        let elapsed = clock.elapsed();
        let out_of_time = self.limits.max_elapsed.is_some_and(|max| elapsed > max);
        if page > self.limits.max_pages || out_of_time {
            warn!(
                "{} pagination exceeded its limits (page {}, {:?} elapsed)",
                job.kind, page, elapsed
            );
            return SyncState::Aborted(SyncError::RunawayPagination {
                next_page: page,
                elapsed,
            });
        }

        match self.fetcher.fetch_page(job, page).await {
            Ok(raw) => {
                progress.pages_fetched += 1;
                progress.last_page_seen = Some(raw.last_page());
                if raw.is_empty() {
                    info!("{} page {} is empty, nothing more to sync", job.kind, page);
                    SyncState::Done(StopReason::EmptyPage)
                } else {
                    SyncState::Mapping { page, raw }
                }
            }
            Err(source) => SyncState::Aborted(SyncError::Fetch { page, source }),
        }
    }

    async fn write(
        &self,
        job: &JobDescriptor,
        page: u32,
        records: &[MappedRecord],
        last_page: i64,
        progress: &mut SyncProgress,
    ) -> SyncState {
        match self.store.upsert_batch(job.kind, records).await {
            Ok(written) => {
                progress.pages_processed += 1;
                progress.records_written += written as u64;
                info!(
                    "📄 {} page {}/{}: {} records written",
                    job.kind, page, last_page, written
                );

                match page.checked_add(1) {
                    Some(next) if i64::from(next) > last_page => {
                        SyncState::Done(StopReason::LastPageReached)
                    }
                    Some(next) => SyncState::Fetching { page: next },
                    None => SyncState::Aborted(SyncError::RunawayPagination {
                        next_page: page,
                        elapsed: Duration::ZERO,
                    }),
                }
            }
            Err(source) => SyncState::Aborted(SyncError::Upsert { page, source }),
        }
    }
}
