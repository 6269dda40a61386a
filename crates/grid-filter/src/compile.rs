//! Group combination: many rules, one answer per row.

use grid_model::row::Row;
use grid_model::{FilterGroup, FilterLogic, FilterRule};

use crate::operators::{OperatorTable, RowPredicate};

/// A compiled filter group ready to evaluate against rows.
///
/// Rules that compiled to "no constraint" are dropped before grouping;
/// a group left with zero predicates is satisfied by every row.
pub struct CompiledGroup {
    predicates: Vec<RowPredicate>,
    logic: FilterLogic,
}

impl CompiledGroup {
    /// Number of effective (constraining) predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the group constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Evaluate the group against one row.
    pub fn matches(&self, row: &Row) -> bool {
        if self.predicates.is_empty() {
            return true;
        }
        match self.logic {
            FilterLogic::And => self.predicates.iter().all(|p| p(row)),
            FilterLogic::Or => self.predicates.iter().any(|p| p(row)),
        }
    }
}

/// Compile and combine a set of rules under the given logic.
pub fn combine(table: &OperatorTable, rules: &[FilterRule], logic: FilterLogic) -> CompiledGroup {
    let predicates = rules.iter().filter_map(|r| table.compile(r)).collect();
    CompiledGroup { predicates, logic }
}

/// Compile a whole filter group.
pub fn compile_group(table: &OperatorTable, group: &FilterGroup) -> CompiledGroup {
    combine(table, &group.filters, group.logic)
}
