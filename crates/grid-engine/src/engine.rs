//! The engine facade.
//!
//! One object, constructed once, owning the table store, the selection
//! engine, and the fetch coordinator. Hosts talk to the facade instead
//! of wiring the parts themselves; operations are grouped by concern
//! below. Store mutations notify the coordinator synchronously, so a
//! setter call is all it takes to schedule a (debounced) fetch.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::debug;

use grid_export::{
    ExportError, ExportFormat, ExportHandle, ExportPage, ExportRequest, ExportSource,
    ExportUpdate, spawn_export,
};
use grid_fetch::{
    DataSource, FetchCoordinator, FetchTicket, FetchUpdate, Page, RequestOutcome,
};
use grid_filter::{OperatorTable, QueryNode};
use grid_model::row::Row;
use grid_model::{
    CanonicalQuery, ColumnSpec, FilterLogic, FilterOperator, FilterRule, LayoutSnapshot,
    PaginationState, SelectionSnapshot, SelectionState, SessionSnapshot, SortDirection,
    SortEntry,
};
use grid_state::{SelectionEngine, TableFeature, TableState, TableStore};
use serde_json::Value;

use crate::config::EngineConfig;

/// The grid's service object.
pub struct GridEngine {
    store: TableStore,
    selection: SelectionEngine,
    coordinator: Arc<FetchCoordinator>,
    operators: OperatorTable,
    columns: Vec<ColumnSpec>,
    /// Present in push mode; pull-mode hosts fetch on their own.
    source: Option<Arc<dyn DataSource>>,
    config: EngineConfig,
}

impl GridEngine {
    /// Push-mode engine: the coordinator fetches from `source`.
    pub fn new(source: Arc<dyn DataSource>, columns: Vec<ColumnSpec>, config: EngineConfig) -> Self {
        Self::build(source, columns, &[], config, None)
    }

    /// Push-mode engine that also emits `FetchUpdate`s.
    pub fn with_updates(
        source: Arc<dyn DataSource>,
        columns: Vec<ColumnSpec>,
        config: EngineConfig,
        updates: Sender<FetchUpdate>,
    ) -> Self {
        Self::build(source, columns, &[], config, Some(updates))
    }

    /// Push-mode engine with table features composed into the initial
    /// state.
    pub fn with_features(
        source: Arc<dyn DataSource>,
        columns: Vec<ColumnSpec>,
        features: &[&dyn TableFeature],
        config: EngineConfig,
    ) -> Self {
        Self::build(source, columns, features, config, None)
    }

    fn build(
        source: Arc<dyn DataSource>,
        columns: Vec<ColumnSpec>,
        features: &[&dyn TableFeature],
        config: EngineConfig,
        updates: Option<Sender<FetchUpdate>>,
    ) -> Self {
        let coordinator = Arc::new(match updates {
            Some(updates) => {
                FetchCoordinator::with_updates(Arc::clone(&source), config.debounce, updates)
            }
            None => FetchCoordinator::new(Arc::clone(&source), config.debounce),
        });
        let mut engine = Self::assemble(coordinator, columns, features, config);
        engine.source = Some(source);
        engine.refresh();
        engine
    }

    /// Pull-mode engine: `on_query` is notified with a ticket for each
    /// effective query; results come back through `apply_result`.
    pub fn pull(
        on_query: impl Fn(FetchTicket, &CanonicalQuery) + Send + 'static,
        columns: Vec<ColumnSpec>,
        config: EngineConfig,
    ) -> Self {
        let coordinator = Arc::new(FetchCoordinator::pull(on_query, config.debounce));
        let mut engine = Self::assemble(coordinator, columns, &[], config);
        engine.refresh();
        engine
    }

    fn assemble(
        coordinator: Arc<FetchCoordinator>,
        columns: Vec<ColumnSpec>,
        features: &[&dyn TableFeature],
        config: EngineConfig,
    ) -> Self {
        let id_field = config.row_id_field.clone();
        let selection = SelectionEngine::new(config.selection_mode).with_row_id(move |row| {
            row.get(&id_field)
                .map(grid_model::value_display)
                .unwrap_or_default()
        });

        let mut store = TableStore::with_features(features);
        store.set_page_size(config.page_size);
        let fetch_path = Arc::clone(&coordinator);
        store.set_query_listener(move |query| {
            fetch_path.request(query);
        });

        Self {
            store,
            selection,
            coordinator,
            operators: OperatorTable::standard(),
            columns,
            source: None,
            config,
        }
    }

    /// Swap in a custom operator table (affects query-node emission and
    /// nothing already compiled).
    #[must_use]
    pub fn with_operators(mut self, operators: OperatorTable) -> Self {
        self.operators = operators;
        self
    }

    /// Gate which rows participate in selection.
    #[must_use]
    pub fn with_selectable(
        mut self,
        is_selectable: impl Fn(&Row) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.selection = std::mem::replace(
            &mut self.selection,
            SelectionEngine::new(self.config.selection_mode),
        )
        .with_selectable(is_selectable);
        self
    }

    /// The column specifications the engine was built with.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Current table state, read-only.
    pub fn state(&self) -> &TableState {
        self.store.state()
    }

    /// The canonical query for the current state, selection attached.
    pub fn canonical_query(&self) -> CanonicalQuery {
        let mut query = self.store.canonical_query();
        let snapshot = self.selection.snapshot();
        if snapshot.has_selection {
            query.selection = Some(snapshot);
        }
        query
    }

    /// Subscribe to state changes (persistence hooks).
    pub fn subscribe(&mut self, observer: impl FnMut(&TableState) + Send + 'static) -> usize {
        self.store.subscribe(observer)
    }

    /// Remove a state observer.
    pub fn unsubscribe(&mut self, token: usize) {
        self.store.unsubscribe(token);
    }

    // ========================================================================
    // Sorting
    // ========================================================================

    /// Replace the sort order.
    pub fn set_sorting(&mut self, sorting: Vec<SortEntry>) {
        self.store.set_sorting(sorting);
    }

    /// Three-state cycle for one column: unsorted, ascending,
    /// descending, unsorted. Other columns' entries are kept.
    pub fn cycle_sort(&mut self, column_id: &str) {
        self.store.update_sorting(|current| {
            let mut next: Vec<SortEntry> = Vec::with_capacity(current.len() + 1);
            let mut handled = false;
            for entry in current {
                if entry.column_id == column_id {
                    handled = true;
                    if entry.direction == SortDirection::Asc {
                        next.push(SortEntry::new(column_id, SortDirection::Desc));
                    }
                    // Desc cycles out: the entry is dropped.
                } else {
                    next.push(entry.clone());
                }
            }
            if !handled {
                next.push(SortEntry::new(column_id, SortDirection::Asc));
            }
            next
        });
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Jump to a page.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.store.set_page_index(page_index);
    }

    /// Change the page size (resets to page 0).
    pub fn set_page_size(&mut self, page_size: usize) {
        self.store.set_page_size(page_size);
    }

    /// Advance one page, clamped to the last known page count.
    pub fn next_page(&mut self) {
        let pagination = self.store.state().pagination;
        let pages = pagination.total_pages(self.coordinator.total() as usize);
        if pagination.page_index + 1 < pages {
            self.store.set_page_index(pagination.page_index + 1);
        }
    }

    /// Go back one page.
    pub fn previous_page(&mut self) {
        let index = self.store.state().pagination.page_index;
        if index > 0 {
            self.store.set_page_index(index - 1);
        }
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Free-text filter across visible columns.
    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.store.set_global_filter(text);
    }

    /// Include or exclude soft-deleted rows.
    pub fn set_show_deleted(&mut self, show: bool) {
        self.store.set_show_deleted(show);
    }

    /// Add a draft column filter; returns the rule id for later edits.
    pub fn add_filter(&mut self, rule: FilterRule) -> String {
        let id = rule.id.clone();
        self.store.add_pending_filter(rule);
        id
    }

    /// Remove a draft rule.
    pub fn remove_filter(&mut self, rule_id: &str) -> bool {
        self.store.remove_pending_filter(rule_id)
    }

    /// Edit a draft rule's value.
    pub fn set_filter_value(&mut self, rule_id: &str, value: Value) -> bool {
        self.store.set_pending_value(rule_id, value)
    }

    /// Edit a draft rule's operator.
    pub fn set_filter_operator(&mut self, rule_id: &str, operator: FilterOperator) -> bool {
        self.store.set_pending_operator(rule_id, operator)
    }

    /// Change how draft rules combine.
    pub fn set_filter_logic(&mut self, logic: FilterLogic) {
        self.store.set_pending_logic(logic);
    }

    /// Discard draft rules without touching applied ones.
    pub fn clear_pending_filters(&mut self) {
        self.store.clear_pending_filters();
    }

    /// Apply the draft filters: one state change, one fetch.
    pub fn apply_filters(&mut self) {
        self.store.apply_filters();
    }

    /// Drop all filters, draft and applied.
    pub fn clear_filters(&mut self) {
        self.store.clear_filters();
    }

    /// Declarative tree of the *applied* filters, for server-delegated
    /// evaluation. `None` when nothing constrains the result.
    pub fn query_node(&self) -> Option<QueryNode> {
        QueryNode::from_group(&self.operators, &self.store.state().filters)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Select a loaded row.
    pub fn select_row(&mut self, row: &Row) {
        self.selection.select_row(row);
    }

    /// Deselect a loaded row.
    pub fn deselect_row(&mut self, row: &Row) {
        self.selection.deselect_row(row);
    }

    /// Flip a loaded row's selection.
    pub fn toggle_row(&mut self, row: &Row) {
        self.selection.toggle_row(row);
    }

    /// Select or deselect by bare id.
    pub fn select_id(&mut self, id: &str) {
        self.selection.select_id(id);
    }

    pub fn deselect_id(&mut self, id: &str) {
        self.selection.deselect_id(id);
    }

    /// Select everything in scope (current page or all matching rows,
    /// per the configured mode).
    pub fn select_all(&mut self) {
        let rows = self.coordinator.rows();
        self.selection.select_all(&rows);
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) {
        self.selection.deselect_all();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.is_selected(id)
    }

    /// Header-checkbox state: everything in scope selected.
    pub fn is_all_selected(&self) -> bool {
        self.selection.is_all_selected(&self.coordinator.rows())
    }

    /// Header-checkbox state: some but not all selected.
    pub fn is_some_selected(&self) -> bool {
        self.selection.is_some_selected(&self.coordinator.rows())
    }

    /// Selected-row count against the last known matching total.
    pub fn selected_count(&self) -> u64 {
        self.selection.selected_count(self.coordinator.total())
    }

    /// Snapshot for server-side selection algebra.
    pub fn selection_snapshot(&self) -> SelectionSnapshot {
        self.selection.snapshot()
    }

    /// Raw selection state (persistence).
    pub fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    /// Restore a persisted selection.
    pub fn set_selection_state(&mut self, state: SelectionState) {
        self.selection.set_state(state);
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Rows of the currently loaded page.
    pub fn rows(&self) -> Vec<Row> {
        self.coordinator.rows()
    }

    /// Last known matching-row total.
    pub fn total(&self) -> u64 {
        self.coordinator.total()
    }

    /// Whether a fetch is executing.
    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    /// Force a fetch of the current query, bypassing deduplication.
    pub fn refresh(&mut self) -> RequestOutcome {
        debug!("forced refresh");
        self.coordinator.invalidate();
        // Same query shape the store's listener sends, so the dedup
        // key stays comparable across both paths.
        self.coordinator.request(&self.store.canonical_query())
    }

    /// Apply a pull-mode fetch result. `false` means the ticket was
    /// stale and nothing changed.
    pub fn apply_result(&self, ticket: &FetchTicket, page: Page) -> bool {
        self.coordinator.apply_result(ticket, page)
    }

    /// Record a pull-mode fetch failure.
    pub fn report_failure(&self, ticket: &FetchTicket, message: &str) {
        self.coordinator.report_failure(ticket, message);
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Start a background export of every row matching the current
    /// query (all pages, not just the loaded one), honoring filters,
    /// sorting, and any active selection.
    ///
    /// Pull-mode engines have no source to page through; their hosts
    /// drive `grid_export` directly.
    pub fn start_export(
        &self,
        format: ExportFormat,
        output_path: impl Into<PathBuf>,
        updates: Sender<ExportUpdate>,
    ) -> Result<ExportHandle, ExportError> {
        let source = self
            .source
            .as_ref()
            .cloned()
            .ok_or_else(|| ExportError::processing("pull-mode engine has no data source"))?;

        let mut query = self.canonical_query();
        query.pagination = PaginationState::new(0, self.config.export_page_size);
        let page_size = self.config.export_page_size;

        let fetch_page = Box::new(move |index: usize, query: &CanonicalQuery| {
            let mut page_query = query.clone();
            page_query.pagination = PaginationState::new(index, page_size);
            let page = source
                .fetch(&page_query)
                .map_err(|e| ExportError::Processing(e.to_string()))?;
            Ok(ExportPage {
                rows: page.rows,
                total: page.total,
            })
        });

        let snapshot = self.selection.snapshot();
        let mut request = ExportRequest::new(
            ExportSource::Remote {
                query,
                page_size,
                fetch_page,
            },
            self.columns.clone(),
            format,
            output_path,
        )
        .with_row_id_field(self.config.row_id_field.clone());
        if snapshot.has_selection && !snapshot.select_all_matching {
            request = request.with_selection(self.selection.state().clone());
        }

        Ok(spawn_export(request, updates))
    }

    // ========================================================================
    // Snapshot / Restore
    // ========================================================================

    /// Persisted column layout.
    pub fn layout_snapshot(&self) -> LayoutSnapshot {
        self.store.layout_snapshot()
    }

    /// Restore a layout snapshot.
    pub fn restore_layout(&mut self, layout: &LayoutSnapshot) {
        self.store.restore_layout(layout);
    }

    /// Session-scoped view shape (sort, page, filters, show-deleted).
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.store.session_snapshot()
    }

    /// Restore a session by replaying it through the setters, so the
    /// same invariants hold as for interactive updates.
    pub fn restore_session(&mut self, session: &SessionSnapshot) {
        self.store.restore_session(session);
    }
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("state", &self.store.state())
            .field("selection", &self.selection)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}
