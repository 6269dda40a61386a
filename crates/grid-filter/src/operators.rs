//! The operator table: `(ColumnType, FilterOperator)` to predicate builder.
//!
//! Each builder inspects the rule's value and either produces a row
//! predicate or returns `None` when the rule is incomplete (no value
//! where one is required, `any` for a boolean check, an empty set for
//! membership). A `None` here means "no constraint" - the combiner
//! drops the rule entirely rather than treating it as match-nothing.
//!
//! Validity of an operator for a column type is a registration-time
//! concern: the standard table below registers exactly the supported
//! pairs, and `compile` on an unregistered pair falls open to `None`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use grid_model::row::{Row, value_display, value_is_empty, value_to_f64};
use grid_model::{ColumnType, FilterOperator, FilterRule};

/// An executable boolean constraint over a row.
pub type RowPredicate = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// Builds a predicate from a rule, or `None` when the rule is incomplete.
pub type PredicateBuilder = fn(&FilterRule) -> Option<RowPredicate>;

/// Error raised when constructing an operator table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperatorTableError {
    /// The pair already has a registered builder.
    #[error("operator {operator:?} is already registered for column type {column_type:?}")]
    Duplicate {
        column_type: ColumnType,
        operator: FilterOperator,
    },
}

/// Mapping from `(ColumnType, FilterOperator)` to a predicate builder.
pub struct OperatorTable {
    builders: HashMap<(ColumnType, FilterOperator), PredicateBuilder>,
}

impl OperatorTable {
    /// An empty table with no registered operators.
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// The standard table covering the full operator matrix.
    pub fn standard() -> Self {
        use ColumnType as T;
        use FilterOperator as Op;

        let defs: &[(&[ColumnType], FilterOperator, PredicateBuilder)] = &[
            // Text and number share the string/comparison branch.
            (&[T::Text, T::Number], Op::Equals, build_text_equals),
            (&[T::Text, T::Number], Op::NotEquals, build_text_not_equals),
            (&[T::Text, T::Number], Op::Contains, build_contains),
            (&[T::Text, T::Number], Op::NotContains, build_not_contains),
            (&[T::Text, T::Number], Op::StartsWith, build_starts_with),
            (&[T::Text, T::Number], Op::EndsWith, build_ends_with),
            (&[T::Text, T::Number], Op::GreaterThan, build_greater_than),
            (
                &[T::Text, T::Number],
                Op::GreaterThanOrEqual,
                build_greater_or_equal,
            ),
            (&[T::Text, T::Number], Op::LessThan, build_less_than),
            (
                &[T::Text, T::Number],
                Op::LessThanOrEqual,
                build_less_or_equal,
            ),
            (
                &[T::Text, T::Number, T::Date],
                Op::IsEmpty,
                build_is_empty,
            ),
            (
                &[T::Text, T::Number, T::Date],
                Op::IsNotEmpty,
                build_is_not_empty,
            ),
            // Dates compare on the parsed day.
            (&[T::Date], Op::Equals, build_date_equals),
            (&[T::Date], Op::NotEquals, build_date_not_equals),
            (&[T::Date], Op::After, build_date_after),
            (&[T::Date], Op::Before, build_date_before),
            // Booleans only answer `is`.
            (&[T::Boolean], Op::Is, build_boolean_is),
            // Select columns: membership plus exact pass-through.
            (&[T::Select], Op::In, build_in),
            (&[T::Select], Op::NotIn, build_not_in),
            (&[T::Select], Op::Equals, build_select_equals),
            (&[T::Select], Op::NotEquals, build_select_not_equals),
        ];

        let mut table = Self::empty();
        for (types, op, builder) in defs {
            for ty in *types {
                table.builders.insert((*ty, *op), *builder);
            }
        }
        table
    }

    /// Register a builder, rejecting duplicates.
    pub fn register(
        &mut self,
        column_type: ColumnType,
        operator: FilterOperator,
        builder: PredicateBuilder,
    ) -> Result<(), OperatorTableError> {
        if self.builders.contains_key(&(column_type, operator)) {
            return Err(OperatorTableError::Duplicate {
                column_type,
                operator,
            });
        }
        self.builders.insert((column_type, operator), builder);
        Ok(())
    }

    /// Whether the pair has a registered builder.
    pub fn supports(&self, column_type: ColumnType, operator: FilterOperator) -> bool {
        self.builders.contains_key(&(column_type, operator))
    }

    /// Compile a rule into a predicate.
    ///
    /// Returns `None` for unregistered pairs and incomplete rules; the
    /// caller must treat that as "always true", not "always false".
    pub fn compile(&self, rule: &FilterRule) -> Option<RowPredicate> {
        let Some(builder) = self.builders.get(&(rule.column_type, rule.operator)) else {
            debug!(
                column = %rule.column_id,
                operator = ?rule.operator,
                column_type = ?rule.column_type,
                "no operator registered; rule contributes no constraint"
            );
            return None;
        };
        builder(rule)
    }
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorTable")
            .field("registered", &self.builders.len())
            .finish()
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

/// Non-empty trimmed string form of a value, or `None`.
fn non_empty_string(value: &Value) -> Option<String> {
    let s = value_display(value);
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a value as a calendar day. Accepts `YYYY-MM-DD` and RFC 3339.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value_display(value);
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Interpret a cell as a boolean. Accepts real booleans and the
/// strings `true`/`false`.
fn cell_truth(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cell_string(row: &Row, column_id: &str) -> String {
    row.get(column_id)
        .map(value_display)
        .unwrap_or_default()
        .to_lowercase()
}

fn cell_number(row: &Row, column_id: &str) -> Option<f64> {
    row.get(column_id).and_then(value_to_f64)
}

fn cell_date(row: &Row, column_id: &str) -> Option<NaiveDate> {
    row.get(column_id).and_then(parse_date)
}

// ============================================================================
// String Builders
// ============================================================================

fn build_contains(rule: &FilterRule) -> Option<RowPredicate> {
    let needle = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_string(row, &column).contains(&needle)
    }))
}

fn build_not_contains(rule: &FilterRule) -> Option<RowPredicate> {
    let needle = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        !cell_string(row, &column).contains(&needle)
    }))
}

fn build_starts_with(rule: &FilterRule) -> Option<RowPredicate> {
    let needle = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_string(row, &column).starts_with(&needle)
    }))
}

fn build_ends_with(rule: &FilterRule) -> Option<RowPredicate> {
    let needle = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_string(row, &column).ends_with(&needle)
    }))
}

fn build_text_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| cell_string(row, &column) == target))
}

fn build_text_not_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = non_empty_string(&rule.value)?.to_lowercase();
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| cell_string(row, &column) != target))
}

// ============================================================================
// Numeric Builders
// ============================================================================

fn build_greater_than(rule: &FilterRule) -> Option<RowPredicate> {
    let target = value_to_f64(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_number(row, &column).is_some_and(|n| n > target)
    }))
}

fn build_greater_or_equal(rule: &FilterRule) -> Option<RowPredicate> {
    let target = value_to_f64(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_number(row, &column).is_some_and(|n| n >= target)
    }))
}

fn build_less_than(rule: &FilterRule) -> Option<RowPredicate> {
    let target = value_to_f64(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_number(row, &column).is_some_and(|n| n < target)
    }))
}

fn build_less_or_equal(rule: &FilterRule) -> Option<RowPredicate> {
    let target = value_to_f64(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_number(row, &column).is_some_and(|n| n <= target)
    }))
}

// ============================================================================
// Emptiness Builders
// ============================================================================

fn build_is_empty(rule: &FilterRule) -> Option<RowPredicate> {
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        row.get(&column).is_none_or(value_is_empty)
    }))
}

fn build_is_not_empty(rule: &FilterRule) -> Option<RowPredicate> {
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        row.get(&column).is_some_and(|v| !value_is_empty(v))
    }))
}

// ============================================================================
// Date Builders
// ============================================================================

fn build_date_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = parse_date(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_date(row, &column) == Some(target)
    }))
}

fn build_date_not_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = parse_date(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_date(row, &column) != Some(target)
    }))
}

fn build_date_after(rule: &FilterRule) -> Option<RowPredicate> {
    let target = parse_date(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_date(row, &column).is_some_and(|d| d > target)
    }))
}

fn build_date_before(rule: &FilterRule) -> Option<RowPredicate> {
    let target = parse_date(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        cell_date(row, &column).is_some_and(|d| d < target)
    }))
}

// ============================================================================
// Boolean Builder
// ============================================================================

fn build_boolean_is(rule: &FilterRule) -> Option<RowPredicate> {
    // `any` (or anything unrecognized) means no constraint.
    let target = cell_truth(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        row.get(&column).and_then(cell_truth) == Some(target)
    }))
}

// ============================================================================
// Select Builders
// ============================================================================

/// Non-empty set of display values from an array rule value.
fn member_set(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    Some(items.iter().map(value_display).collect())
}

fn build_in(rule: &FilterRule) -> Option<RowPredicate> {
    let members = member_set(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        let cell = row.get(&column).map(value_display).unwrap_or_default();
        members.contains(&cell)
    }))
}

fn build_not_in(rule: &FilterRule) -> Option<RowPredicate> {
    let members = member_set(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        let cell = row.get(&column).map(value_display).unwrap_or_default();
        !members.contains(&cell)
    }))
}

fn build_select_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = non_empty_string(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        row.get(&column).map(value_display).unwrap_or_default() == target
    }))
}

fn build_select_not_equals(rule: &FilterRule) -> Option<RowPredicate> {
    let target = non_empty_string(&rule.value)?;
    let column = rule.column_id.clone();
    Some(Arc::new(move |row| {
        row.get(&column).map(value_display).unwrap_or_default() != target
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(op: FilterOperator, value: Value, ty: ColumnType) -> FilterRule {
        FilterRule::new("col", op, value, ty)
    }

    fn row(value: Value) -> Row {
        Row::from_value(value)
    }

    #[test]
    fn empty_value_compiles_to_none() {
        let table = OperatorTable::standard();
        for value in [Value::Null, json!(""), json!("   ")] {
            let r = rule(FilterOperator::Contains, value, ColumnType::Text);
            assert!(table.compile(&r).is_none());
        }
    }

    #[test]
    fn unregistered_pair_is_fail_open() {
        let table = OperatorTable::standard();
        let r = rule(FilterOperator::After, json!("2024-01-01"), ColumnType::Boolean);
        assert!(table.compile(&r).is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut table = OperatorTable::standard();
        let err = table
            .register(ColumnType::Text, FilterOperator::Contains, build_contains)
            .unwrap_err();
        assert!(matches!(err, OperatorTableError::Duplicate { .. }));
    }

    #[test]
    fn boolean_any_means_no_constraint() {
        let table = OperatorTable::standard();
        let r = rule(FilterOperator::Is, json!("any"), ColumnType::Boolean);
        assert!(table.compile(&r).is_none());

        let r = rule(FilterOperator::Is, json!("true"), ColumnType::Boolean);
        let pred = table.compile(&r).unwrap();
        assert!(pred(&row(json!({"col": true}))));
        assert!(pred(&row(json!({"col": "true"}))));
        assert!(!pred(&row(json!({"col": false}))));
        assert!(!pred(&row(json!({"col": "maybe"}))));
    }

    #[test]
    fn date_window() {
        let table = OperatorTable::standard();
        let after = table
            .compile(&rule(
                FilterOperator::After,
                json!("2024-06-15"),
                ColumnType::Date,
            ))
            .unwrap();
        assert!(after(&row(json!({"col": "2024-06-16"}))));
        assert!(!after(&row(json!({"col": "2024-06-15"}))));
        assert!(!after(&row(json!({"col": "garbage"}))));
    }

    #[test]
    fn select_membership_requires_non_empty_array() {
        let table = OperatorTable::standard();
        assert!(
            table
                .compile(&rule(FilterOperator::In, json!([]), ColumnType::Select))
                .is_none()
        );

        let pred = table
            .compile(&rule(
                FilterOperator::In,
                json!(["red", "blue"]),
                ColumnType::Select,
            ))
            .unwrap();
        assert!(pred(&row(json!({"col": "red"}))));
        assert!(!pred(&row(json!({"col": "green"}))));
    }

    #[test]
    fn is_empty_ignores_value() {
        let table = OperatorTable::standard();
        let pred = table
            .compile(&rule(FilterOperator::IsEmpty, Value::Null, ColumnType::Text))
            .unwrap();
        assert!(pred(&row(json!({}))));
        assert!(pred(&row(json!({"col": null}))));
        assert!(pred(&row(json!({"col": ""}))));
        assert!(!pred(&row(json!({"col": "x"}))));
    }
}
