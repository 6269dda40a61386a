//! The canonical query: a derived, minimal description of
//! sorting + pagination + filters sufficient to reproduce a result set.
//!
//! Never stored — recomputed whenever any constituent changes and
//! handed to the fetch coordinator and the export pipeline.

use serde::{Deserialize, Serialize};

use crate::filter::FilterGroup;
use crate::pagination::PaginationState;
use crate::selection::SelectionSnapshot;
use crate::sort::SortEntry;

/// Canonical description of what the grid is asking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalQuery {
    pub sorting: Vec<SortEntry>,
    pub pagination: PaginationState,
    /// Free-text filter matched across visible columns.
    pub global_filter: String,
    /// The *applied* filter group (pending edits never appear here).
    pub filters: FilterGroup,
    /// Present when the consumer needs the selection algebra (export).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionSnapshot>,
    /// Whether soft-deleted rows are included.
    #[serde(default)]
    pub show_deleted: bool,
}

impl CanonicalQuery {
    /// Serialize to a deep-value comparison key.
    ///
    /// Two queries with equal content produce equal keys regardless of
    /// how they were constructed, which is what the fetch coordinator's
    /// dedup rule compares.
    pub fn comparison_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortDirection;

    #[test]
    fn equal_content_equal_key() {
        let a = CanonicalQuery {
            sorting: vec![SortEntry::new("name", SortDirection::Asc)],
            global_filter: "jo".to_string(),
            ..Default::default()
        };
        let b = a.clone();
        assert_eq!(a.comparison_key(), b.comparison_key());
    }

    #[test]
    fn different_pagination_different_key() {
        let a = CanonicalQuery::default();
        let mut b = a.clone();
        b.pagination.page_index = 2;
        assert_ne!(a.comparison_key(), b.comparison_key());
    }
}
