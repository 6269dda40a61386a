//! Persisted layout and session shapes.
//!
//! The engine does not own storage: hosts persist these through any
//! `get(key)`/`set(key, value)` store and restore them by replaying the
//! values through the state store's setters. Layout is long-lived
//! (column geometry); session is shorter-lived (what the user was
//! looking at).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::FilterGroup;
use crate::pagination::PaginationState;
use crate::sort::SortEntry;

/// Pinned column ids by side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPinning {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

/// Long-lived column layout snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    pub column_visibility: BTreeMap<String, bool>,
    pub column_order: Vec<String>,
    pub column_sizing: BTreeMap<String, f64>,
    pub column_pinning: ColumnPinning,
}

/// Session-scoped view snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub sorting: Vec<SortEntry>,
    pub pagination: PaginationState,
    pub global_filter: String,
    pub column_filter: FilterGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_deleted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_round_trips_through_json() {
        let mut layout = LayoutSnapshot::default();
        layout.column_visibility.insert("a".to_string(), false);
        layout.column_order = vec!["b".to_string(), "a".to_string()];
        layout.column_sizing.insert("a".to_string(), 120.0);
        layout.column_pinning.left.push("b".to_string());

        let json = serde_json::to_string(&layout).unwrap();
        let back: LayoutSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(layout, back);
    }
}
