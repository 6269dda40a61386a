//! The table feature seam.
//!
//! Features contribute initial state to the store at construction
//! instead of augmenting a shared type surface at a distance. Each
//! custom capability (column filters, show-deleted) is an independent
//! feature registered into one store; the facade exposes its methods.

use grid_model::{FilterGroup, FilterLogic};

use crate::store::TableState;

/// A pluggable table capability composed into the store when it is
/// built.
pub trait TableFeature {
    /// Stable name, used for logging.
    fn name(&self) -> &'static str;

    /// Seed this feature's slice of the initial state.
    fn initialize(&self, state: &mut TableState);
}

/// Column filtering with a configurable default combination logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnFilterFeature {
    pub default_logic: FilterLogic,
}

impl TableFeature for ColumnFilterFeature {
    fn name(&self) -> &'static str {
        "column-filter"
    }

    fn initialize(&self, state: &mut TableState) {
        state.filters = FilterGroup::new(self.default_logic);
        state.pending = FilterGroup::new(self.default_logic);
    }
}

/// Soft-deleted row visibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShowDeletedFeature {
    pub initially_visible: bool,
}

impl TableFeature for ShowDeletedFeature {
    fn name(&self) -> &'static str {
        "show-deleted"
    }

    fn initialize(&self, state: &mut TableState) {
        state.show_deleted = self.initially_visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;

    #[test]
    fn features_seed_initial_state() {
        let filter = ColumnFilterFeature {
            default_logic: FilterLogic::Or,
        };
        let deleted = ShowDeletedFeature {
            initially_visible: true,
        };
        let store = TableStore::with_features(&[&filter, &deleted]);
        assert_eq!(store.state().filters.logic, FilterLogic::Or);
        assert_eq!(store.state().pending.logic, FilterLogic::Or);
        assert!(store.state().show_deleted);
    }
}
