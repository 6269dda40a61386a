//! Include/exclude selection state and host-facing snapshots.
//!
//! A selection is either the explicit member set (`include`) or the
//! complement of a small exclusion list against an implicit universe
//! (`exclude`). The exclude form is what makes "select all 500,000
//! matching rows" representable without enumerating them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// How the id set is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionKind {
    /// `ids` are the selected rows.
    #[default]
    Include,
    /// Every matching row except `ids` is selected.
    Exclude,
}

/// Raw selection state. The set never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub ids: BTreeSet<String>,
    #[serde(rename = "type")]
    pub kind: SelectionKind,
}

impl SelectionState {
    /// Empty include selection: nothing selected.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exclude-with-empty-exclusions: everything matching is selected.
    pub fn all_matching() -> Self {
        Self {
            ids: BTreeSet::new(),
            kind: SelectionKind::Exclude,
        }
    }

    /// Whether a row id is currently selected.
    pub fn is_selected(&self, id: &str) -> bool {
        match self.kind {
            SelectionKind::Include => self.ids.contains(id),
            SelectionKind::Exclude => !self.ids.contains(id),
        }
    }

    /// Number of selected rows given the total matching-row count.
    ///
    /// This is the only selection operation that needs knowledge from
    /// outside the set itself; `total` comes from the fetch
    /// coordinator's last known total.
    pub fn selected_count(&self, total: u64) -> u64 {
        match self.kind {
            SelectionKind::Include => self.ids.len() as u64,
            SelectionKind::Exclude => total.saturating_sub(self.ids.len() as u64),
        }
    }

    /// Whether any row at all is selected, given the total.
    pub fn any_selected(&self, total: u64) -> bool {
        self.selected_count(total) > 0
    }
}

/// Selection snapshot handed to a server-mode host, letting it apply
/// the same include/exclude algebra server-side instead of shipping
/// every row id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub has_selection: bool,
    pub select_all_matching: bool,
    pub selected_ids: Vec<String>,
    pub excluded_ids: Vec<String>,
}

impl SelectionSnapshot {
    /// Snapshot the current state.
    pub fn from_state(state: &SelectionState) -> Self {
        match state.kind {
            SelectionKind::Include => Self {
                has_selection: !state.ids.is_empty(),
                select_all_matching: false,
                selected_ids: state.ids.iter().cloned().collect(),
                excluded_ids: Vec::new(),
            },
            SelectionKind::Exclude => Self {
                has_selection: true,
                select_all_matching: state.ids.is_empty(),
                selected_ids: Vec::new(),
                excluded_ids: state.ids.iter().cloned().collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exclude_complements_membership() {
        let mut state = SelectionState::all_matching();
        state.ids.insert("r5".to_string());
        assert!(!state.is_selected("r5"));
        assert!(state.is_selected("r1"));
    }

    #[test]
    fn snapshot_distinguishes_all_matching() {
        let all = SelectionSnapshot::from_state(&SelectionState::all_matching());
        assert!(all.select_all_matching && all.has_selection);

        let mut minus_one = SelectionState::all_matching();
        minus_one.ids.insert("x".to_string());
        let snap = SelectionSnapshot::from_state(&minus_one);
        assert!(!snap.select_all_matching);
        assert_eq!(snap.excluded_ids, vec!["x".to_string()]);
    }

    proptest! {
        // selectedCount(total) == total - |ids| for exclude,
        // |ids| for include, whenever total >= |ids|.
        #[test]
        fn count_algebra(ids in proptest::collection::btree_set("[a-z]{1,4}", 0..32), extra in 0u64..1000) {
            let total = ids.len() as u64 + extra;
            let include = SelectionState { ids: ids.clone(), kind: SelectionKind::Include };
            prop_assert_eq!(include.selected_count(total), ids.len() as u64);
            let exclude = SelectionState { ids: ids.clone(), kind: SelectionKind::Exclude };
            prop_assert_eq!(exclude.selected_count(total), total - ids.len() as u64);
        }
    }
}
