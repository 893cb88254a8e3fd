//! Sync job descriptor
//!
//! A [`JobDescriptor`] carries everything one run needs to talk to the API.
//! It is built once per invocation and never mutated afterwards.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::entity::{DateFromPolicy, EntityKind};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub kind: EntityKind,
    /// `{base_url}/{endpoint}`
    pub endpoint_url: String,
    pub api_key: String,
    pub date_from: NaiveDate,
    /// Always the run's day; only sent when the kind's schema asks for it
    pub date_to: NaiveDate,
    pub page_size: u32,
}

impl JobDescriptor {
    /// Resolve the date range for `kind` on calendar day `today`.
    ///
    /// Incomes, orders and sales re-walk from `start_date`; stocks only ask
    /// for today's snapshot.
    pub fn new(
        kind: EntityKind,
        base_url: &str,
        api_key: &str,
        start_date: NaiveDate,
        today: NaiveDate,
        page_size: u32,
    ) -> Self {
        let schema = kind.schema();
        let date_from = match schema.date_from {
            DateFromPolicy::ConfiguredStart => start_date,
            DateFromPolicy::Today => today,
        };

        Self {
            kind,
            endpoint_url: format!("{}/{}", base_url.trim_end_matches('/'), schema.endpoint),
            api_key: api_key.to_string(),
            date_from,
            date_to: today,
            page_size,
        }
    }

    /// Query parameters for page `page`.
    pub fn query(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![("dateFrom", self.date_from.format(DATE_FORMAT).to_string())];
        if self.kind.schema().sends_date_to {
            params.push(("dateTo", self.date_to.format(DATE_FORMAT).to_string()));
        }
        params.push(("page", page.to_string()));
        params.push(("key", self.api_key.clone()));
        params.push(("limit", self.page_size.to_string()));
        params
    }
}

impl fmt::Debug for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDescriptor")
            .field("kind", &self.kind)
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &"<redacted>")
            .field("date_from", &self.date_from)
            .field("date_to", &self.date_to)
            .field("page_size", &self.page_size)
            .finish()
    }
}
