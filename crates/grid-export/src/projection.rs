//! Row projection: turn a row into the cells the artifact will carry.
//!
//! Exports see exactly what the grid shows. Hidden columns are skipped
//! and each cell goes through the column's resolution and formatting,
//! so a formatted currency column exports its formatted text.

use grid_model::row::Row;
use grid_model::ColumnSpec;

/// Headers for the artifact, visible columns only, export header wins.
pub fn export_headers(columns: &[ColumnSpec]) -> Vec<String> {
    columns
        .iter()
        .filter(|column| column.visible)
        .map(|column| column.effective_header().to_string())
        .collect()
}

/// Project one row through the visible columns.
pub fn project_row(columns: &[ColumnSpec], row: &Row) -> Vec<String> {
    columns
        .iter()
        .filter(|column| column.visible)
        .map(|column| column.display(row))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("name", "Name"),
            ColumnSpec::new("secret", "Secret").hidden(),
            ColumnSpec::new("price", "Price")
                .with_export_header("Unit Price")
                .with_formatter(|v| format!("${:.2}", v.as_f64().unwrap_or(0.0))),
        ]
    }

    #[test]
    fn hidden_columns_are_skipped() {
        assert_eq!(export_headers(&columns()), vec!["Name", "Unit Price"]);
    }

    #[test]
    fn cells_use_display_formatting() {
        let row = Row::from_value(json!({"name": "Widget", "secret": "x", "price": 3.5}));
        assert_eq!(project_row(&columns(), &row), vec!["Widget", "$3.50"]);
    }

    #[test]
    fn missing_fields_project_empty() {
        let row = Row::from_value(json!({}));
        assert_eq!(project_row(&columns(), &row), vec!["", "$0.00"]);
    }
}
