//! Engine construction knobs.

use std::time::Duration;

use grid_model::pagination::DEFAULT_PAGE_SIZE;
use grid_state::SelectionMode;

/// Tunables for a `GridEngine`. `Default` matches interactive use.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period between a state change and the fetch it triggers.
    pub debounce: Duration,
    /// Initial page size.
    pub page_size: usize,
    /// Scope of select-all.
    pub selection_mode: SelectionMode,
    /// Field identifying rows for selection and export filtering.
    pub row_id_field: String,
    /// Rows pulled per page while exporting.
    pub export_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: grid_fetch::DEFAULT_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
            selection_mode: SelectionMode::Page,
            row_id_field: "id".to_string(),
            export_page_size: 500,
        }
    }
}
