//! Record mapper: raw API items to [`MappedRecord`]s
//!
//! Projection only. Values are taken as they arrive; the only check is that
//! every column of the kind's field table is present in the item.

use serde_json::Value;

use crate::domain::entity::EntityKind;
use crate::domain::errors::MappingError;
use crate::domain::record::{FieldValue, MappedRecord};

/// Longest item excerpt quoted in a [`MappingError`]
const ITEM_EXCERPT_LEN: usize = 300;

/// Project one raw item onto `kind`'s field table.
///
/// The error carries `item_index` 0; [`map_page`] sets the real position.
pub fn map_item(kind: EntityKind, raw: &Value) -> Result<MappedRecord, MappingError> {
    let Some(object) = raw.as_object() else {
        return Err(MappingError::NotAnObject {
            item_index: 0,
            item: excerpt(raw),
        });
    };

    let schema = kind.schema();
    let mut values = Vec::with_capacity(schema.column_count());
    for column in schema.columns() {
        let value = object.get(column).ok_or_else(|| MappingError::MissingField {
            field: column,
            item_index: 0,
            item: excerpt(raw),
        })?;
        values.push(FieldValue::from(value));
    }

    Ok(MappedRecord::from_values(kind, values))
}

/// Map a whole page, all or nothing: the first bad item fails the page.
pub fn map_page(kind: EntityKind, items: &[Value]) -> Result<Vec<MappedRecord>, MappingError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| map_item(kind, item).map_err(|e| e.at_index(idx)))
        .collect()
}

fn excerpt(raw: &Value) -> String {
    let text = raw.to_string();
    if text.chars().count() <= ITEM_EXCERPT_LEN {
        return text;
    }
    let mut cut: String = text.chars().take(ITEM_EXCERPT_LEN).collect();
    cut.push_str("...");
    cut
}
