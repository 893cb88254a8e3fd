//! Structured result of one sync run

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::entity::EntityKind;
use crate::domain::errors::{ErrorCategory, SyncError};
use crate::domain::job::JobDescriptor;

/// Why a successful run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The API returned a page without records
    EmptyPage,
    /// The next page number exceeded the declared `last_page`
    LastPageReached,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed { stop_reason: StopReason },
    Failed { error: ReportedError },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub category: ErrorCategory,
    pub exit_code: u8,
    pub message: String,
}

impl From<&SyncError> for ReportedError {
    fn from(err: &SyncError) -> Self {
        Self {
            category: err.category(),
            exit_code: err.exit_code(),
            message: err.to_string(),
        }
    }
}

/// Counters accumulated while a run progresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    /// Fetch calls that returned a page, including the final empty one
    pub pages_fetched: u32,
    /// Pages whose records were all written
    pub pages_processed: u32,
    pub records_written: u64,
    /// `last_page` declared by the most recent page
    pub last_page_seen: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub entity: EntityKind,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub progress: SyncProgress,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    pub fn new(
        job: &JobDescriptor,
        started_at: DateTime<Utc>,
        progress: SyncProgress,
        result: &Result<StopReason, SyncError>,
    ) -> Self {
        let outcome = match result {
            Ok(stop_reason) => SyncOutcome::Completed {
                stop_reason: *stop_reason,
            },
            Err(err) => SyncOutcome::Failed { error: err.into() },
        };

        Self {
            run_id: Uuid::new_v4(),
            entity: job.kind,
            date_from: job.date_from,
            date_to: job.date_to,
            started_at,
            finished_at: Utc::now(),
            progress,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SyncOutcome::Completed { .. })
    }

    pub fn error(&self) -> Option<&ReportedError> {
        match &self.outcome {
            SyncOutcome::Failed { error } => Some(error),
            SyncOutcome::Completed { .. } => None,
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.error().map_or(0, |e| e.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FetchError;

    fn job() -> JobDescriptor {
        JobDescriptor::new(
            EntityKind::Incomes,
            "http://api.example",
            "k",
            NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 12).unwrap(),
            100,
        )
    }

    #[test]
    fn test_completed_report_serializes_flat() {
        let progress = SyncProgress {
            pages_fetched: 2,
            pages_processed: 2,
            records_written: 3,
            last_page_seen: Some(2),
        };
        let report = SyncReport::new(&job(), Utc::now(), progress, &Ok(StopReason::LastPageReached));

        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entity"], "incomes");
        assert_eq!(json["records_written"], 3);
        assert_eq!(json["date_from"], "2026-02-10");
        assert_eq!(json["outcome"]["status"], "completed");
        assert_eq!(json["outcome"]["stop_reason"], "last_page_reached");
    }

    #[test]
    fn test_failed_report_carries_first_error() {
        let err = SyncError::Fetch {
            page: 4,
            source: FetchError::ServerError { status: 503 },
        };
        let report = SyncReport::new(&job(), Utc::now(), SyncProgress::default(), &Err(err));

        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 2);
        let error = report.error().unwrap();
        assert_eq!(error.category, ErrorCategory::Fetch);
        assert!(error.message.contains("503"));
    }
}
