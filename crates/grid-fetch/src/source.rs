//! Data sources: who evaluates the canonical query.
//!
//! Client mode holds the full dataset and evaluates filtering, sorting,
//! and pagination locally. Server mode forwards the query to a host
//! callback and trusts the result. Both satisfy the same contract, so
//! the coordinator never special-cases the data's location.

use std::cmp::Ordering;
use std::sync::Arc;

use grid_filter::{OperatorTable, compile_group};
use grid_model::row::{Row, value_display, value_to_f64};
use grid_model::{CanonicalQuery, ColumnSpec, SortDirection};

use crate::error::FetchError;

/// One fetched result: the page of rows plus the matching total.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<Row>,
    pub total: u64,
}

/// Anything that can answer a canonical query.
pub trait DataSource: Send + Sync {
    fn fetch(&self, query: &CanonicalQuery) -> Result<Page, FetchError>;
}

// ============================================================================
// Server Source
// ============================================================================

/// Host-supplied fetch callback (the network round trip lives inside).
pub struct ServerSource {
    fetch: Box<dyn Fn(&CanonicalQuery) -> Result<Page, FetchError> + Send + Sync>,
}

impl ServerSource {
    pub fn new(
        fetch: impl Fn(&CanonicalQuery) -> Result<Page, FetchError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            fetch: Box::new(fetch),
        }
    }
}

impl DataSource for ServerSource {
    fn fetch(&self, query: &CanonicalQuery) -> Result<Page, FetchError> {
        (self.fetch)(query)
    }
}

// ============================================================================
// Client Source
// ============================================================================

/// In-memory dataset evaluated locally.
pub struct ClientSource {
    rows: Vec<Row>,
    columns: Arc<[ColumnSpec]>,
    operators: OperatorTable,
    /// Field marking soft-deleted rows; rows where it is `true` are
    /// hidden unless the query asks for them.
    deleted_field: String,
}

impl ClientSource {
    pub fn new(rows: Vec<Row>, columns: impl Into<Arc<[ColumnSpec]>>) -> Self {
        Self {
            rows,
            columns: columns.into(),
            operators: OperatorTable::standard(),
            deleted_field: "deleted".to_string(),
        }
    }

    /// Use a custom operator table.
    #[must_use]
    pub fn with_operators(mut self, operators: OperatorTable) -> Self {
        self.operators = operators;
        self
    }

    /// Change which field marks soft-deleted rows.
    #[must_use]
    pub fn with_deleted_field(mut self, field: impl Into<String>) -> Self {
        self.deleted_field = field.into();
        self
    }

    /// Replace the resident dataset.
    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
    }

    fn matches_global_filter(&self, row: &Row, needle: &str) -> bool {
        if self.columns.is_empty() {
            // No column specs: match across every field.
            return row
                .0
                .values()
                .any(|v| value_display(v).to_lowercase().contains(needle));
        }
        self.columns
            .iter()
            .filter(|c| c.visible)
            .any(|c| c.display(row).to_lowercase().contains(needle))
    }
}

impl DataSource for ClientSource {
    fn fetch(&self, query: &CanonicalQuery) -> Result<Page, FetchError> {
        let compiled = compile_group(&self.operators, &query.filters);
        let needle = query.global_filter.trim().to_lowercase();

        let mut matching: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| {
                query.show_deleted
                    || row.get(&self.deleted_field).and_then(|v| v.as_bool()) != Some(true)
            })
            .filter(|row| needle.is_empty() || self.matches_global_filter(row, &needle))
            .filter(|row| compiled.matches(row))
            .collect();

        if !query.sorting.is_empty() {
            matching.sort_by(|a, b| {
                for entry in &query.sorting {
                    let ord = compare_cells(a.get(&entry.column_id), b.get(&entry.column_id));
                    let ord = match entry.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let total = matching.len() as u64;
        let start = query.pagination.offset().min(matching.len());
        let end = (start + query.pagination.page_size).min(matching.len());
        let rows = matching[start..end].iter().map(|r| (*r).clone()).collect();

        Ok(Page { rows, total })
    }
}

/// Order two cell values: numerically when both coerce, otherwise as
/// case-insensitive strings with missing values sorting last.
fn compare_cells(a: Option<&serde_json::Value>, b: Option<&serde_json::Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            if let (Some(x), Some(y)) = (value_to_f64(a), value_to_f64(b)) {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            } else {
                value_display(a)
                    .to_lowercase()
                    .cmp(&value_display(b).to_lowercase())
            }
        }
    }
}
