//! Terminal rendering of a result page.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use grid_model::row::Row;
use grid_model::ColumnSpec;

/// Build a terminal table for one page of rows.
pub fn page_table(columns: &[ColumnSpec], rows: &[Row]) -> Table {
    let visible: Vec<&ColumnSpec> = columns.iter().filter(|c| c.visible).collect();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        visible
            .iter()
            .map(|c| Cell::new(&c.header).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for row in rows {
        table.add_row(visible.iter().map(|c| c.display(row)).collect::<Vec<_>>());
    }

    // Right-align columns whose loaded cells are all numeric.
    for (index, column) in visible.iter().enumerate() {
        let numeric = !rows.is_empty()
            && rows.iter().all(|row| {
                let value = column.resolve(row);
                value.is_null() || grid_model::value_to_f64(&value).is_some()
            });
        if numeric
            && let Some(col) = table.column_mut(index)
        {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

/// One-line footer: paging position and totals.
pub fn page_footer(page_index: usize, total_pages: usize, shown: usize, total: u64) -> String {
    format!("page {}/{total_pages} - {shown} of {total} matching rows", page_index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hidden_columns_do_not_render() {
        let columns = vec![
            ColumnSpec::new("name", "Name"),
            ColumnSpec::new("secret", "Secret").hidden(),
        ];
        let rows = vec![Row::from_value(json!({"name": "Amy", "secret": "x"}))];
        let rendered = page_table(&columns, &rows).to_string();
        assert!(rendered.contains("Amy"));
        assert!(!rendered.contains("Secret"));
        assert!(!rendered.contains('x'));
    }

    #[test]
    fn footer_is_one_based() {
        assert_eq!(page_footer(0, 3, 10, 25), "page 1/3 - 10 of 25 matching rows");
    }
}
