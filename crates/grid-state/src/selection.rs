//! The selection engine.
//!
//! A second, independent store beside the table state: selection
//! persists across sort changes, and page-mode selection is implicitly
//! scoped to "current page" without the engine eagerly clearing it.
//! Operating on an id that is not in the loaded rows is never an error;
//! the set operation still applies and may become relevant once that
//! row is fetched.

use std::sync::Arc;

use grid_model::row::{Row, value_display};
use grid_model::{SelectionKind, SelectionSnapshot, SelectionState};

/// Scope of select-all: the current page, or every matching row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    Page,
    All,
}

/// Extracts a stable row id.
pub type RowIdFn = Arc<dyn Fn(&Row) -> String + Send + Sync>;

/// Gates whether a row participates in selection at all.
pub type SelectableFn = Arc<dyn Fn(&Row) -> bool + Send + Sync>;

/// State machine over `SelectionState`.
pub struct SelectionEngine {
    state: SelectionState,
    mode: SelectionMode,
    row_id: RowIdFn,
    is_selectable: SelectableFn,
}

impl SelectionEngine {
    /// Engine with the default id field (`id`) and all rows selectable.
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            state: SelectionState::none(),
            mode,
            row_id: Arc::new(|row| row.get("id").map(value_display).unwrap_or_default()),
            is_selectable: Arc::new(|_| true),
        }
    }

    /// Override how row ids are derived.
    #[must_use]
    pub fn with_row_id(mut self, row_id: impl Fn(&Row) -> String + Send + Sync + 'static) -> Self {
        self.row_id = Arc::new(row_id);
        self
    }

    /// Supply the selectability predicate.
    #[must_use]
    pub fn with_selectable(
        mut self,
        is_selectable: impl Fn(&Row) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_selectable = Arc::new(is_selectable);
        self
    }

    /// Current raw state.
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Replace the raw state (snapshot restore).
    pub fn set_state(&mut self, state: SelectionState) {
        self.state = state;
    }

    /// The configured scope.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Id of a row under the configured extraction.
    pub fn row_id(&self, row: &Row) -> String {
        (self.row_id)(row)
    }

    /// Whether a row participates in selection.
    pub fn row_selectable(&self, row: &Row) -> bool {
        (self.is_selectable)(row)
    }

    // ========================================================================
    // Row Operations
    // ========================================================================

    /// Select by id. Under exclude semantics this un-excludes.
    pub fn select_id(&mut self, id: &str) {
        match self.state.kind {
            SelectionKind::Exclude => {
                self.state.ids.remove(id);
            }
            SelectionKind::Include => {
                self.state.ids.insert(id.to_string());
            }
        }
    }

    /// Deselect by id. Under exclude semantics this excludes.
    pub fn deselect_id(&mut self, id: &str) {
        match self.state.kind {
            SelectionKind::Exclude => {
                self.state.ids.insert(id.to_string());
            }
            SelectionKind::Include => {
                self.state.ids.remove(id);
            }
        }
    }

    /// Select a loaded row, honoring the selectability gate.
    pub fn select_row(&mut self, row: &Row) {
        if self.row_selectable(row) {
            self.select_id(&self.row_id(row));
        }
    }

    /// Deselect a loaded row, honoring the selectability gate.
    pub fn deselect_row(&mut self, row: &Row) {
        if self.row_selectable(row) {
            self.deselect_id(&self.row_id(row));
        }
    }

    /// Flip a loaded row's selection.
    pub fn toggle_row(&mut self, row: &Row) {
        if !self.row_selectable(row) {
            return;
        }
        let id = self.row_id(row);
        if self.is_selected(&id) {
            self.deselect_id(&id);
        } else {
            self.select_id(&id);
        }
    }

    // ========================================================================
    // Bulk Operations
    // ========================================================================

    /// Select everything in scope.
    ///
    /// All mode: `{exclude, []}` - every matching row, including ones
    /// never fetched. Page mode: union the selectable ids of the
    /// current page into an include set; include ids selected on other
    /// pages are kept (the set is id-based).
    pub fn select_all(&mut self, page_rows: &[Row]) {
        match self.mode {
            SelectionMode::All => {
                self.state = SelectionState::all_matching();
            }
            SelectionMode::Page => {
                if self.state.kind == SelectionKind::Exclude {
                    // Switching representation resets the set.
                    self.state = SelectionState::none();
                }
                for row in page_rows {
                    if self.row_selectable(row) {
                        self.state.ids.insert(self.row_id(row));
                    }
                }
            }
        }
    }

    /// Clear the selection entirely.
    pub fn deselect_all(&mut self) {
        self.state = SelectionState::none();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether a row id is selected.
    pub fn is_selected(&self, id: &str) -> bool {
        self.state.is_selected(id)
    }

    /// Whether everything in scope is selected.
    pub fn is_all_selected(&self, page_rows: &[Row]) -> bool {
        match self.mode {
            SelectionMode::All => {
                self.state.kind == SelectionKind::Exclude && self.state.ids.is_empty()
            }
            SelectionMode::Page => {
                let mut any = false;
                for row in page_rows {
                    if !self.row_selectable(row) {
                        continue;
                    }
                    any = true;
                    if !self.is_selected(&self.row_id(row)) {
                        return false;
                    }
                }
                any
            }
        }
    }

    /// Whether the selection is partial (some but not all).
    pub fn is_some_selected(&self, page_rows: &[Row]) -> bool {
        match self.mode {
            SelectionMode::All => {
                if self.state.kind == SelectionKind::Exclude {
                    !self.state.ids.is_empty()
                } else {
                    !self.state.ids.is_empty() && !self.is_all_selected(page_rows)
                }
            }
            SelectionMode::Page => {
                let selected = page_rows
                    .iter()
                    .filter(|row| self.row_selectable(row))
                    .filter(|row| self.is_selected(&self.row_id(row)))
                    .count();
                selected > 0 && !self.is_all_selected(page_rows)
            }
        }
    }

    /// Number of selected rows, given the last known matching total.
    pub fn selected_count(&self, total_matching_rows: u64) -> u64 {
        self.state.selected_count(total_matching_rows)
    }

    /// Snapshot for server-side selection algebra.
    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot::from_state(&self.state)
    }
}

impl std::fmt::Debug for SelectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionEngine")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .finish()
    }
}
