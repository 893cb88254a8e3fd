//! Entity schemas for the four marketplace record kinds
//!
//! Every kind is described by one static [`EntitySchema`]: the API endpoint it
//! is pulled from, the table it lands in, the identity key that makes a stored
//! row unique and the value columns overwritten on every sync. The engine is
//! generic over these tables; nothing else differs between kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Record kinds exposed by the marketplace statistics API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Incomes,
    Orders,
    Sales,
    Stocks,
}

impl EntityKind {
    pub const ALL: [Self; 4] = [Self::Incomes, Self::Orders, Self::Sales, Self::Stocks];

    pub fn schema(self) -> &'static EntitySchema {
        match self {
            Self::Incomes => &INCOMES,
            Self::Orders => &ORDERS,
            Self::Sales => &SALES,
            Self::Stocks => &STOCKS,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.schema().endpoint
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown entity kind '{0}' (expected one of: incomes, orders, sales, stocks)")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownEntityKind(s.to_string()))
    }
}

/// Where a run's `dateFrom` comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFromPolicy {
    /// The configured historical start date (full backfill on every run)
    ConfiguredStart,
    /// The run's own calendar day; stock snapshots are per-day
    Today,
}

/// Static description of one record kind
#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Path segment appended to the API base URL
    pub endpoint: &'static str,
    pub table: &'static str,
    /// Identity key; at most one stored row per key value
    pub key_columns: &'static [&'static str],
    /// Columns overwritten when the identity key already exists
    pub value_columns: &'static [&'static str],
    pub date_from: DateFromPolicy,
    /// Whether the request carries a `dateTo` parameter
    pub sends_date_to: bool,
}

impl EntitySchema {
    /// Key columns followed by value columns; the field order of every mapped record.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> {
        self.key_columns
            .iter()
            .chain(self.value_columns.iter())
            .copied()
    }

    pub fn column_count(&self) -> usize {
        self.key_columns.len() + self.value_columns.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns().position(|c| c == column)
    }
}

pub static INCOMES: EntitySchema = EntitySchema {
    kind: EntityKind::Incomes,
    endpoint: "incomes",
    table: "incomes",
    key_columns: &["income_id", "barcode"],
    value_columns: &[
        "number",
        "date",
        "last_change_date",
        "supplier_article",
        "tech_size",
        "quantity",
        "total_price",
        "date_close",
        "warehouse_name",
        "nm_id",
    ],
    date_from: DateFromPolicy::ConfiguredStart,
    sends_date_to: true,
};

pub static ORDERS: EntitySchema = EntitySchema {
    kind: EntityKind::Orders,
    endpoint: "orders",
    table: "orders",
    key_columns: &["odid", "g_number"],
    value_columns: &[
        "date",
        "last_change_date",
        "supplier_article",
        "tech_size",
        "barcode",
        "total_price",
        "discount_percent",
        "warehouse_name",
        "oblast",
        "income_id",
        "nm_id",
        "subject",
        "category",
        "brand",
        "is_cancel",
        "cancel_dt",
    ],
    date_from: DateFromPolicy::ConfiguredStart,
    sends_date_to: true,
};

pub static SALES: EntitySchema = EntitySchema {
    kind: EntityKind::Sales,
    endpoint: "sales",
    table: "sales",
    key_columns: &["sale_id"],
    value_columns: &[
        "g_number",
        "date",
        "last_change_date",
        "supplier_article",
        "tech_size",
        "barcode",
        "total_price",
        "discount_percent",
        "is_supply",
        "is_realization",
        "promo_code_discount",
        "warehouse_name",
        "country_name",
        "oblast_okrug_name",
        "region_name",
        "income_id",
        "odid",
        "spp",
        "for_pay",
        "finished_price",
        "price_with_disc",
        "nm_id",
        "subject",
        "category",
        "brand",
        "is_storno",
    ],
    date_from: DateFromPolicy::ConfiguredStart,
    sends_date_to: true,
};

pub static STOCKS: EntitySchema = EntitySchema {
    kind: EntityKind::Stocks,
    endpoint: "stocks",
    table: "stocks",
    key_columns: &["date", "warehouse_name", "nm_id"],
    value_columns: &[
        "last_change_date",
        "supplier_article",
        "tech_size",
        "barcode",
        "quantity",
        "is_supply",
        "is_realization",
        "quantity_full",
        "in_way_to_client",
        "in_way_from_client",
        "subject",
        "category",
        "brand",
        "sc_code",
        "price",
        "discount",
    ],
    date_from: DateFromPolicy::Today,
    sends_date_to: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_order_schema_has_eighteen_fields() {
        assert_eq!(EntityKind::Orders.schema().column_count(), 18);
    }

    #[test]
    fn test_schemas_have_no_duplicate_columns() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            let unique: HashSet<_> = schema.columns().collect();
            assert_eq!(unique.len(), schema.column_count(), "{kind} repeats a column");
            assert_eq!(schema.kind, kind);
        }
    }

    #[test]
    fn test_key_columns_come_first() {
        let schema = EntityKind::Stocks.schema();
        let first: Vec<_> = schema.columns().take(3).collect();
        assert_eq!(first, vec!["date", "warehouse_name", "nm_id"]);
        assert_eq!(schema.column_index("nm_id"), Some(2));
        assert_eq!(schema.column_index("discount"), Some(18));
        assert_eq!(schema.column_index("missing"), None);
    }

    #[test]
    fn test_only_stocks_start_today() {
        for kind in EntityKind::ALL {
            let schema = kind.schema();
            let is_stocks = kind == EntityKind::Stocks;
            assert_eq!(schema.date_from == DateFromPolicy::Today, is_stocks);
            assert_eq!(schema.sends_date_to, !is_stocks);
        }
    }

    #[test]
    fn test_entity_kind_round_trips_through_str() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.to_string().parse::<EntityKind>(), Ok(kind));
        }
        assert_eq!(" Sales ".parse::<EntityKind>(), Ok(EntityKind::Sales));
        assert!("refunds".parse::<EntityKind>().is_err());
    }
}
