//! Multi-key sort descriptors.

use serde::{Deserialize, Serialize};

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One entry in the sort order. Insertion order is tie-break priority:
/// the first entry is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortEntry {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn new(column_id: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column_id: column_id.into(),
            direction,
        }
    }

    /// Entries with an empty column id are transient artifacts of
    /// three-state sort cycling and must not be stored.
    pub fn is_valid(&self) -> bool {
        !self.column_id.is_empty()
    }
}
