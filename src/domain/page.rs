//! Raw page envelope returned by the marketplace API

use serde::Deserialize;
use serde_json::Value;

/// Pagination block of a response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub last_page: Option<i64>,
}

/// One response page: `{ "data": [...], "meta": { "last_page": N } }`.
///
/// `data` absent or `null` reads as an empty page; `meta.last_page` absent
/// reads as 1 ("this is the last page").
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

impl RawPage {
    pub fn new(items: Vec<Value>, last_page: Option<i64>) -> Self {
        Self {
            data: Some(items),
            meta: Some(PageMeta { last_page }),
        }
    }

    pub fn items(&self) -> &[Value] {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn last_page(&self) -> i64 {
        self.meta
            .as_ref()
            .and_then(|meta| meta.last_page)
            .unwrap_or(1)
    }
}
