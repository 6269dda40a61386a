//! Filter rules, groups, operators, and column types.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(1);

/// Logical column type, selecting which operators are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
}

/// Filter comparison operator.
///
/// Not every operator applies to every column type; the compiler's
/// operator table decides which pairs are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    IsEmpty,
    IsNotEmpty,
    /// Boolean check (`true` / `false` / `any`).
    Is,
    /// Date strictly after the given day.
    After,
    /// Date strictly before the given day.
    Before,
    /// Membership in a set of allowed values.
    In,
    /// Exclusion from a set of values.
    NotIn,
}

/// How rules within a group combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterLogic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// A single column filter rule.
///
/// The `id` is engine-generated and immutable; it identifies the rule
/// across pending-filter edits. The operator is not validated against
/// the column type here: an incompatible pair compiles to "no
/// constraint" (fail-open) rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    pub id: String,
    pub column_id: String,
    pub operator: FilterOperator,
    pub value: Value,
    pub column_type: ColumnType,
}

impl FilterRule {
    /// Create a rule with a fresh engine-generated id.
    pub fn new(
        column_id: impl Into<String>,
        operator: FilterOperator,
        value: Value,
        column_type: ColumnType,
    ) -> Self {
        let id = format!("rule-{}", NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            id,
            column_id: column_id.into(),
            operator,
            value,
            column_type,
        }
    }
}

/// An ordered set of rules combined under one logic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub filters: Vec<FilterRule>,
    pub logic: FilterLogic,
}

impl FilterGroup {
    /// Create an empty group with the given logic.
    pub fn new(logic: FilterLogic) -> Self {
        Self {
            filters: Vec::new(),
            logic,
        }
    }

    /// Whether the group holds no rules.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Append a rule.
    pub fn add(&mut self, rule: FilterRule) {
        self.filters.push(rule);
    }

    /// Remove a rule by id. Returns whether a rule was removed.
    pub fn remove(&mut self, rule_id: &str) -> bool {
        let before = self.filters.len();
        self.filters.retain(|r| r.id != rule_id);
        self.filters.len() != before
    }

    /// Find a rule by id for editing (value/operator only; ids are fixed).
    pub fn get_mut(&mut self, rule_id: &str) -> Option<&mut FilterRule> {
        self.filters.iter_mut().find(|r| r.id == rule_id)
    }
}
