//! Declarative query fragments for server-delegated filtering.
//!
//! A server-mode host forwards filters as data rather than evaluating
//! them locally. The same completeness rules apply as for compilation:
//! incomplete rules are omitted from the emitted tree, so client and
//! server modes agree on which rules constrain the result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use grid_model::{FilterGroup, FilterLogic, FilterOperator, FilterRule};

use crate::operators::OperatorTable;

/// One leaf constraint in a query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub column_id: String,
    pub operator: FilterOperator,
    pub value: Value,
}

/// A serializable filter tree: `{"and": [...]}`, `{"or": [...]}`, or a
/// bare rule object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryNode {
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    #[serde(untagged)]
    Rule(RuleNode),
}

impl QueryNode {
    /// Build the query fragment for a filter group.
    ///
    /// Incomplete rules (those the table would compile to `None`) are
    /// dropped. Returns `None` when nothing constrains the result, so
    /// callers can omit the fragment from the outgoing request.
    pub fn from_group(table: &OperatorTable, group: &FilterGroup) -> Option<Self> {
        let leaves: Vec<QueryNode> = group
            .filters
            .iter()
            .filter(|rule| table.compile(rule).is_some())
            .map(|rule| QueryNode::Rule(rule_node(rule)))
            .collect();

        if leaves.is_empty() {
            return None;
        }
        Some(match group.logic {
            FilterLogic::And => QueryNode::And(leaves),
            FilterLogic::Or => QueryNode::Or(leaves),
        })
    }
}

fn rule_node(rule: &FilterRule) -> RuleNode {
    RuleNode {
        column_id: rule.column_id.clone(),
        operator: rule.operator,
        value: rule.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::ColumnType;
    use serde_json::json;

    #[test]
    fn emits_and_tree() {
        let table = OperatorTable::standard();
        let mut group = FilterGroup::default();
        group.add(FilterRule::new(
            "age",
            FilterOperator::GreaterThan,
            json!(20),
            ColumnType::Number,
        ));
        group.add(FilterRule::new(
            "name",
            FilterOperator::Contains,
            json!("jo"),
            ColumnType::Text,
        ));

        let node = QueryNode::from_group(&table, &group).unwrap();
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            json!({"and": [
                {"columnId": "age", "operator": "greaterThan", "value": 20},
                {"columnId": "name", "operator": "contains", "value": "jo"}
            ]})
        );
    }

    #[test]
    fn incomplete_rules_are_omitted() {
        let table = OperatorTable::standard();
        let mut group = FilterGroup::new(FilterLogic::Or);
        group.add(FilterRule::new(
            "name",
            FilterOperator::Contains,
            json!(""),
            ColumnType::Text,
        ));
        assert_eq!(QueryNode::from_group(&table, &group), None);

        group.add(FilterRule::new(
            "name",
            FilterOperator::Contains,
            json!("a"),
            ColumnType::Text,
        ));
        let node = QueryNode::from_group(&table, &group).unwrap();
        match node {
            QueryNode::Or(leaves) => assert_eq!(leaves.len(), 1),
            other => panic!("expected or-node, got {other:?}"),
        }
    }
}
