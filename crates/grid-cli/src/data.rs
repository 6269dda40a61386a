//! Row-file loading.
//!
//! The CLI accepts two formats: a JSON array of objects, or a CSV file
//! whose header row names the fields. CSV cells are coerced to JSON
//! scalars (bool, number, string) so numeric and boolean filters work
//! the same on either input.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use grid_model::row::Row;
use grid_model::ColumnSpec;
use serde_json::Value;

/// Load rows from a `.json` or `.csv` file.
pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("unsupported data file extension: {other:?} (expected .json or .csv)"),
    }
}

/// Derive column specs from the loaded rows: one visible column per
/// field, in the order fields first appear.
pub fn derive_columns(rows: &[Row]) -> Vec<ColumnSpec> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        for key in row.0.keys() {
            if !seen.iter().any(|k| k == key) {
                seen.push(key.clone());
            }
        }
    }
    seen.into_iter()
        .map(|id| {
            let header = id.clone();
            ColumnSpec::new(id, header)
        })
        .collect()
}

fn load_json(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let value: Value = serde_json::from_reader(file)
        .with_context(|| format!("parse {}", path.display()))?;
    let Value::Array(items) = value else {
        bail!("{} must contain a JSON array of objects", path.display());
    };
    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            bail!("{}: element {index} is not an object", path.display());
        }
        rows.push(Row::from_value(item));
    }
    Ok(rows)
}

fn load_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("read headers from {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("{}: record {index}", path.display()))?;
        let mut row = Row::new();
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.insert(header, coerce_cell(cell));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Coerce a CSV cell to the tightest JSON scalar.
fn coerce_cell(cell: &str) -> Value {
    match cell {
        "" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => {
            if let Ok(n) = other.parse::<i64>() {
                return Value::from(n);
            }
            if let Ok(f) = other.parse::<f64>() {
                if let Some(number) = serde_json::Number::from_f64(f) {
                    return Value::Number(number);
                }
            }
            Value::String(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_cells_coerce_to_scalars() {
        assert_eq!(coerce_cell("42"), serde_json::json!(42));
        assert_eq!(coerce_cell("4.5"), serde_json::json!(4.5));
        assert_eq!(coerce_cell("true"), serde_json::json!(true));
        assert_eq!(coerce_cell("hello"), serde_json::json!("hello"));
        assert_eq!(coerce_cell(""), Value::Null);
    }

    #[test]
    fn csv_round_trips_through_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "id,name,age").unwrap();
        writeln!(file, "r1,Amy,28").unwrap();
        writeln!(file, "r2,Bob,").unwrap();
        drop(file);

        let rows = load_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("age"), Some(&serde_json::json!(28)));
        assert_eq!(rows[1].get("age"), Some(&Value::Null));

        let columns = derive_columns(&rows);
        let ids: Vec<_> = columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["age", "id", "name"]);
    }

    #[test]
    fn json_must_be_an_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        assert!(load_rows(&path).is_err());

        std::fs::write(&path, "[{\"id\": \"r1\"}, 7]").unwrap();
        assert!(load_rows(&path).is_err());

        std::fs::write(&path, "[{\"id\": \"r1\"}]").unwrap();
        assert_eq!(load_rows(&path).unwrap().len(), 1);
    }
}
