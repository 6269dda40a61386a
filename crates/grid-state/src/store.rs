//! The table state store.
//!
//! One owned object holds every state slice; UI layers are pure
//! observers. Setters never mutate in place: they build the replacement
//! value, swap it in, then notify synchronously - the fetch path first,
//! then external observers, so a host persisting "current state"
//! captures the state that caused the in-flight fetch.

use std::collections::BTreeMap;

use tracing::debug;

use grid_model::{
    CanonicalQuery, ColumnPinning, FilterGroup, FilterLogic, FilterOperator, FilterRule,
    LayoutSnapshot, PaginationState, SessionSnapshot, SortEntry,
};
use serde_json::Value;

use crate::feature::TableFeature;

/// Every state slice the grid queries or persists.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    pub sorting: Vec<SortEntry>,
    pub pagination: PaginationState,
    pub global_filter: String,
    /// Applied column filters - these drive queries.
    pub filters: FilterGroup,
    /// Draft column filters - edited freely, affecting nothing until
    /// applied.
    pub pending: FilterGroup,
    pub column_order: Vec<String>,
    pub column_visibility: BTreeMap<String, bool>,
    pub column_sizing: BTreeMap<String, f64>,
    pub column_pinning: ColumnPinning,
    pub show_deleted: bool,
}

type QueryListener = Box<dyn FnMut(&CanonicalQuery) + Send>;
type StateObserver = Box<dyn FnMut(&TableState) + Send>;

/// Pure-update state container with subscriber notification.
pub struct TableStore {
    state: TableState,
    query_listener: Option<QueryListener>,
    observers: Vec<(usize, StateObserver)>,
    next_observer_id: usize,
}

impl TableStore {
    /// A store with default state and no features.
    pub fn new() -> Self {
        Self {
            state: TableState::default(),
            query_listener: None,
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Compose features into the initial state.
    pub fn with_features(features: &[&dyn TableFeature]) -> Self {
        let mut store = Self::new();
        for feature in features {
            debug!(feature = feature.name(), "initializing table feature");
            feature.initialize(&mut store.state);
        }
        store
    }

    /// Current state, read-only.
    pub fn state(&self) -> &TableState {
        &self.state
    }

    /// Register the fetch-path listener. It is notified before any
    /// observer, with the recomputed canonical query.
    pub fn set_query_listener(&mut self, listener: impl FnMut(&CanonicalQuery) + Send + 'static) {
        self.query_listener = Some(Box::new(listener));
    }

    /// Subscribe an external state observer; returns a token for
    /// `unsubscribe`.
    pub fn subscribe(&mut self, observer: impl FnMut(&TableState) + Send + 'static) -> usize {
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a previously subscribed observer.
    pub fn unsubscribe(&mut self, token: usize) {
        self.observers.retain(|(id, _)| *id != token);
    }

    /// Derive the canonical query from the current state.
    pub fn canonical_query(&self) -> CanonicalQuery {
        CanonicalQuery {
            sorting: self.state.sorting.clone(),
            pagination: self.state.pagination,
            global_filter: self.state.global_filter.clone(),
            filters: self.state.filters.clone(),
            selection: None,
            show_deleted: self.state.show_deleted,
        }
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    /// Replace the sort order. Entries with an empty column id are
    /// dropped: three-state sort cycling produces one transient invalid
    /// entry when passing through "unset".
    pub fn set_sorting(&mut self, sorting: Vec<SortEntry>) {
        self.state.sorting = sorting.into_iter().filter(SortEntry::is_valid).collect();
        self.notify_query_change();
    }

    /// Functional update over the current sort order.
    pub fn update_sorting(&mut self, update: impl FnOnce(&[SortEntry]) -> Vec<SortEntry>) {
        let next = update(&self.state.sorting);
        self.set_sorting(next);
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Jump to a page.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.state.pagination.page_index = page_index;
        self.notify_query_change();
    }

    /// Change the page size. Resets the page index to 0; keeping the
    /// old index could point past the end of the resized result.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.state.pagination = PaginationState::new(0, page_size);
        self.notify_query_change();
    }

    /// Functional update over pagination. Page-size changes through
    /// this path reset the index as well.
    pub fn update_pagination(
        &mut self,
        update: impl FnOnce(&PaginationState) -> PaginationState,
    ) {
        let prev = self.state.pagination;
        let next = update(&prev);
        if next.page_size != prev.page_size {
            self.state.pagination = PaginationState::new(0, next.page_size);
        } else {
            self.state.pagination = next;
        }
        self.notify_query_change();
    }

    // ========================================================================
    // Global Filter
    // ========================================================================

    /// Set the free-text filter.
    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.state.global_filter = text.into();
        self.notify_query_change();
    }

    /// Include or exclude soft-deleted rows.
    pub fn set_show_deleted(&mut self, show: bool) {
        self.state.show_deleted = show;
        self.notify_query_change();
    }

    // ========================================================================
    // Column Filters (draft / apply)
    // ========================================================================
    //
    // Pending edits never notify the fetch path: the draft/apply split
    // exists so multi-filter edits do not trigger a fetch per keystroke.

    /// Add a draft rule.
    pub fn add_pending_filter(&mut self, rule: FilterRule) {
        self.state.pending.add(rule);
    }

    /// Remove a draft rule by id.
    pub fn remove_pending_filter(&mut self, rule_id: &str) -> bool {
        self.state.pending.remove(rule_id)
    }

    /// Edit a draft rule's value.
    pub fn set_pending_value(&mut self, rule_id: &str, value: Value) -> bool {
        match self.state.pending.get_mut(rule_id) {
            Some(rule) => {
                rule.value = value;
                true
            }
            None => false,
        }
    }

    /// Edit a draft rule's operator.
    pub fn set_pending_operator(&mut self, rule_id: &str, operator: FilterOperator) -> bool {
        match self.state.pending.get_mut(rule_id) {
            Some(rule) => {
                rule.operator = operator;
                true
            }
            None => false,
        }
    }

    /// Change the draft combination logic.
    pub fn set_pending_logic(&mut self, logic: FilterLogic) {
        self.state.pending.logic = logic;
    }

    /// Discard all draft rules.
    pub fn clear_pending_filters(&mut self) {
        self.state.pending = FilterGroup::new(self.state.pending.logic);
    }

    /// Copy the draft group into the applied group atomically, then -
    /// and only then - notify the fetch path.
    pub fn apply_filters(&mut self) {
        self.state.filters = self.state.pending.clone();
        self.notify_query_change();
    }

    /// Clear both draft and applied filters.
    pub fn clear_filters(&mut self) {
        let logic = self.state.filters.logic;
        self.state.pending = FilterGroup::new(logic);
        self.state.filters = FilterGroup::new(logic);
        self.notify_query_change();
    }

    // ========================================================================
    // Column Layout
    // ========================================================================
    //
    // Layout does not participate in the canonical query; these notify
    // observers only (for persistence).

    /// Replace the column display order.
    pub fn set_column_order(&mut self, order: Vec<String>) {
        self.state.column_order = order;
        self.notify_observers();
    }

    /// Show or hide a column.
    pub fn set_column_visible(&mut self, column_id: impl Into<String>, visible: bool) {
        self.state
            .column_visibility
            .insert(column_id.into(), visible);
        self.notify_observers();
    }

    /// Record a column width.
    pub fn set_column_size(&mut self, column_id: impl Into<String>, width: f64) {
        self.state.column_sizing.insert(column_id.into(), width);
        self.notify_observers();
    }

    /// Replace the pinning assignment.
    pub fn set_column_pinning(&mut self, pinning: ColumnPinning) {
        self.state.column_pinning = pinning;
        self.notify_observers();
    }

    // ========================================================================
    // Snapshot / Restore
    // ========================================================================

    /// Capture the persisted layout shape.
    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            column_visibility: self.state.column_visibility.clone(),
            column_order: self.state.column_order.clone(),
            column_sizing: self.state.column_sizing.clone(),
            column_pinning: self.state.column_pinning.clone(),
        }
    }

    /// Restore a layout snapshot by replaying it through the setters.
    pub fn restore_layout(&mut self, layout: &LayoutSnapshot) {
        self.set_column_order(layout.column_order.clone());
        for (id, visible) in &layout.column_visibility {
            self.set_column_visible(id.clone(), *visible);
        }
        for (id, width) in &layout.column_sizing {
            self.set_column_size(id.clone(), *width);
        }
        self.set_column_pinning(layout.column_pinning.clone());
    }

    /// Capture the session-scoped view shape.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sorting: self.state.sorting.clone(),
            pagination: self.state.pagination,
            global_filter: self.state.global_filter.clone(),
            column_filter: self.state.filters.clone(),
            show_deleted: Some(self.state.show_deleted),
        }
    }

    /// Restore a session snapshot through the setters, so the same
    /// invariants hold as for interactive updates. Page size is applied
    /// before page index because the size setter resets the index.
    pub fn restore_session(&mut self, session: &SessionSnapshot) {
        self.set_sorting(session.sorting.clone());
        self.set_page_size(session.pagination.page_size);
        self.set_page_index(session.pagination.page_index);
        self.set_global_filter(session.global_filter.clone());
        self.state.pending = session.column_filter.clone();
        self.apply_filters();
        if let Some(show) = session.show_deleted {
            self.set_show_deleted(show);
        }
    }

    // ========================================================================
    // Notification
    // ========================================================================

    fn notify_query_change(&mut self) {
        let query = self.canonical_query();
        if let Some(listener) = &mut self.query_listener {
            listener(&query);
        }
        self.notify_observers();
    }

    fn notify_observers(&mut self) {
        for (_, observer) in &mut self.observers {
            observer(&self.state);
        }
    }
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}
