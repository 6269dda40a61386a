//! Column specifications.
//!
//! A `ColumnSpec` describes how a column resolves its value from a row
//! and how that value is rendered. Export and client-side evaluation
//! share this resolution so exported values match what the grid shows.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::row::{Row, value_display};

/// Derives a cell value from a whole row (for computed/nested fields).
pub type ValueGetter = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

/// Formats a resolved value for display and export.
pub type ValueFormatter = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Column description: identity, headers, visibility, and value access.
#[derive(Clone)]
pub struct ColumnSpec {
    /// Stable column identifier (used by sorting, filtering, layout).
    pub id: String,
    /// Header shown in the grid.
    pub header: String,
    /// Header used in exported artifacts when it should differ from the
    /// display header.
    pub export_header: Option<String>,
    /// Hidden columns are never exported and are skipped by the global
    /// filter.
    pub visible: bool,
    /// Field name to read when it differs from the column id.
    pub accessor: Option<String>,
    /// Computed value resolver; takes priority over `accessor`.
    pub value_getter: Option<ValueGetter>,
    /// Display-equivalent formatting (currency, dates, ...).
    pub formatter: Option<ValueFormatter>,
}

impl ColumnSpec {
    /// Create a visible column reading the field named by `id`.
    pub fn new(id: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            header: header.into(),
            export_header: None,
            visible: true,
            accessor: None,
            value_getter: None,
            formatter: None,
        }
    }

    /// Read from a different field than the column id.
    #[must_use]
    pub fn with_accessor(mut self, field: impl Into<String>) -> Self {
        self.accessor = Some(field.into());
        self
    }

    /// Override the header used in exports.
    #[must_use]
    pub fn with_export_header(mut self, header: impl Into<String>) -> Self {
        self.export_header = Some(header.into());
        self
    }

    /// Resolve the value through a closure instead of a field lookup.
    #[must_use]
    pub fn with_value_getter(
        mut self,
        getter: impl Fn(&Row) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.value_getter = Some(Arc::new(getter));
        self
    }

    /// Attach a display formatter.
    #[must_use]
    pub fn with_formatter(
        mut self,
        formatter: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatter = Some(Arc::new(formatter));
        self
    }

    /// Mark the column hidden.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Header to use in exported artifacts.
    pub fn effective_header(&self) -> &str {
        self.export_header.as_deref().unwrap_or(&self.header)
    }

    /// Resolve this column's raw value from a row.
    ///
    /// Priority: value getter, then accessor field, then a direct lookup
    /// by column id. Missing fields resolve to null.
    pub fn resolve(&self, row: &Row) -> Value {
        if let Some(getter) = &self.value_getter {
            return getter(row);
        }
        let field = self.accessor.as_deref().unwrap_or(&self.id);
        row.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Resolve and format this column's value for display/export.
    pub fn display(&self, row: &Row) -> String {
        let value = self.resolve(row);
        match &self.formatter {
            Some(format) => format(&value),
            None => value_display(&value),
        }
    }
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("id", &self.id)
            .field("header", &self.header)
            .field("export_header", &self.export_header)
            .field("visible", &self.visible)
            .field("accessor", &self.accessor)
            .field("value_getter", &self.value_getter.is_some())
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}
