//! The export pipeline.
//!
//! One driver handles both data locations: local exports walk resident
//! rows, remote exports pull page after page through a host callback.
//! Either way rows stream through the artifact writer one at a time,
//! progress is reported as they go, and a shared cancel flag is checked
//! before every row and page so an abort lands promptly. A cancelled or
//! failed run removes the partial artifact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use grid_model::row::Row;
use grid_model::{CanonicalQuery, ColumnSpec, SelectionState};

use crate::delimited::CsvWriter;
use crate::projection::{export_headers, project_row};
use crate::types::{
    ExportError, ExportFormat, ExportHandle, ExportProgress, ExportResult, ExportUpdate,
};
use crate::workbook::WorkbookWriter;

/// Sink the pipeline streams projected rows into.
pub trait ArtifactWriter {
    fn write_header(&mut self, headers: &[String]) -> Result<(), ExportError>;
    fn write_row(&mut self, cells: &[String]) -> Result<(), ExportError>;
    fn finish(&mut self) -> Result<(), ExportError>;
}

/// One page of a remote export: the rows plus the matching total.
#[derive(Debug, Clone, Default)]
pub struct ExportPage {
    pub rows: Vec<Row>,
    pub total: u64,
}

/// Host callback resolving one zero-based page of the export query.
pub type PageFetcher =
    Box<dyn Fn(usize, &CanonicalQuery) -> Result<ExportPage, ExportError> + Send>;

/// Where the rows come from.
pub enum ExportSource {
    /// Rows already resident; exported as-is after selection filtering.
    Local { rows: Vec<Row> },
    /// Rows fetched page by page. The query carries the filters,
    /// sorting, and selection snapshot the host should honor.
    Remote {
        query: CanonicalQuery,
        page_size: usize,
        fetch_page: PageFetcher,
    },
}

impl std::fmt::Debug for ExportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { rows } => f.debug_struct("Local").field("rows", &rows.len()).finish(),
            Self::Remote { page_size, .. } => f
                .debug_struct("Remote")
                .field("page_size", page_size)
                .finish_non_exhaustive(),
        }
    }
}

/// Everything one export run needs.
#[derive(Debug)]
pub struct ExportRequest {
    pub source: ExportSource,
    pub columns: Vec<ColumnSpec>,
    pub format: ExportFormat,
    pub output_path: PathBuf,
    /// When set, local exports keep only selected rows. Remote hosts
    /// receive the equivalent snapshot inside the query instead.
    pub selection: Option<SelectionState>,
    /// Field identifying a row for selection filtering.
    pub row_id_field: String,
}

impl ExportRequest {
    pub fn new(
        source: ExportSource,
        columns: Vec<ColumnSpec>,
        format: ExportFormat,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            columns,
            format,
            output_path: output_path.into(),
            selection: None,
            row_id_field: "id".to_string(),
        }
    }

    /// Restrict a local export to the selected rows.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Change the field used to identify rows for selection filtering.
    #[must_use]
    pub fn with_row_id_field(mut self, field: impl Into<String>) -> Self {
        self.row_id_field = field.into();
        self
    }
}

// ============================================================================
// Blocking Pipeline
// ============================================================================

/// Run an export to completion on the calling thread.
///
/// Progress is reported through `on_progress`; the final report always
/// reads exactly 100%. `Err(Cancelled)` means the flag was observed,
/// any other error means the run failed. Either way the partial
/// artifact is removed.
pub fn run_export(
    request: ExportRequest,
    cancel: &AtomicBool,
    mut on_progress: impl FnMut(ExportProgress),
) -> Result<ExportResult, ExportError> {
    let headers = export_headers(&request.columns);
    if headers.is_empty() {
        return Err(ExportError::processing("no visible columns to export"));
    }

    let started = Instant::now();
    let path = request.output_path.clone();
    let mut writer: Box<dyn ArtifactWriter> = match request.format {
        ExportFormat::Csv => Box::new(CsvWriter::create(&path)?),
        ExportFormat::Workbook => Box::new(WorkbookWriter::create(&path)?),
    };

    let outcome = drive(request, &headers, writer.as_mut(), cancel, &mut on_progress);
    match outcome {
        Ok(rows_exported) => {
            // Completion is always reported as exactly 100%.
            on_progress(ExportProgress::new(rows_exported, rows_exported));
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!(rows_exported, elapsed_ms, path = %path.display(), "export complete");
            Ok(ExportResult {
                path,
                rows_exported,
                elapsed_ms,
            })
        }
        Err(error) => {
            drop(writer);
            if let Err(remove_error) = std::fs::remove_file(&path) {
                warn!(%remove_error, path = %path.display(), "partial artifact left behind");
            } else {
                debug!(path = %path.display(), "partial artifact removed");
            }
            Err(error)
        }
    }
}

fn drive(
    request: ExportRequest,
    headers: &[String],
    writer: &mut dyn ArtifactWriter,
    cancel: &AtomicBool,
    on_progress: &mut dyn FnMut(ExportProgress),
) -> Result<u64, ExportError> {
    let selection = request.selection.as_ref();
    let keep = |row: &Row| -> bool {
        match selection {
            None => true,
            Some(selection) => {
                let id = row
                    .get(&request.row_id_field)
                    .map(grid_model::value_display)
                    .unwrap_or_default();
                selection.is_selected(&id)
            }
        }
    };

    writer.write_header(headers)?;
    let written = match &request.source {
        ExportSource::Local { rows } => {
            let kept: Vec<&Row> = rows.iter().filter(|row| keep(row)).collect();
            let total = kept.len() as u64;
            let mut written = 0u64;
            for row in kept {
                if cancel.load(Ordering::SeqCst) {
                    return Err(ExportError::Cancelled);
                }
                writer.write_row(&project_row(&request.columns, row))?;
                written += 1;
                on_progress(ExportProgress::new(written, total));
            }
            written
        }
        ExportSource::Remote {
            query,
            page_size,
            fetch_page,
        } => {
            let mut page_index = 0usize;
            // Progress tracks rows pulled, not rows kept: a selection
            // filter must not stall the percentage.
            let mut fetched = 0u64;
            let mut written = 0u64;
            // Hosts may revise the total upward between pages; the
            // reported percentage never moves backwards.
            let mut floor = 0u8;
            loop {
                if cancel.load(Ordering::SeqCst) {
                    return Err(ExportError::Cancelled);
                }
                let page = fetch_page(page_index, query)?;
                // A cancel racing the page round trip still wins.
                if cancel.load(Ordering::SeqCst) {
                    return Err(ExportError::Cancelled);
                }
                if page.rows.is_empty() {
                    break;
                }
                for row in &page.rows {
                    if cancel.load(Ordering::SeqCst) {
                        return Err(ExportError::Cancelled);
                    }
                    fetched += 1;
                    if keep(row) {
                        writer.write_row(&project_row(&request.columns, row))?;
                        written += 1;
                    }
                }
                let total = page.total.max(fetched);
                let mut progress = ExportProgress::new(fetched, total);
                progress.percentage = progress.percentage.max(floor);
                floor = progress.percentage;
                on_progress(progress);
                if fetched >= page.total || page.rows.len() < *page_size {
                    break;
                }
                page_index += 1;
            }
            written
        }
    };
    // Closing flushes buffered output; a failure here ends the run
    // like any other write error, with the partial artifact removed.
    writer.finish()?;
    Ok(written)
}

// ============================================================================
// Background Export
// ============================================================================

/// Run an export on a background thread.
///
/// Updates stream through `updates`; the terminal message is exactly
/// one of `Complete`, `Error`, or `Cancelled`. The returned handle
/// cancels the run.
pub fn spawn_export(request: ExportRequest, updates: Sender<ExportUpdate>) -> ExportHandle {
    let handle = ExportHandle::new();
    let cancel = handle.cancel_flag();
    let progress_sender = updates.clone();
    std::thread::spawn(move || {
        let result = run_export(request, &cancel, |progress| {
            let _ = progress_sender.send(ExportUpdate::Progress(progress));
        });
        let terminal = match result {
            Ok(result) => ExportUpdate::Complete(result),
            Err(ExportError::Cancelled) => ExportUpdate::Cancelled,
            Err(error) => ExportUpdate::Error(error),
        };
        let _ = updates.send(terminal);
    });
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_model::ColumnSpec;

    /// Writer whose rows succeed but whose close fails, as a full disk
    /// does on the final flush.
    struct FailingCloseWriter;

    impl ArtifactWriter for FailingCloseWriter {
        fn write_header(&mut self, _headers: &[String]) -> Result<(), ExportError> {
            Ok(())
        }

        fn write_row(&mut self, _cells: &[String]) -> Result<(), ExportError> {
            Ok(())
        }

        fn finish(&mut self) -> Result<(), ExportError> {
            Err(ExportError::processing("flush failed"))
        }
    }

    #[test]
    fn close_failure_surfaces_through_the_error_path() {
        let request = ExportRequest::new(
            ExportSource::Local {
                rows: vec![Row::from_value(serde_json::json!({"id": "r1"}))],
            },
            vec![ColumnSpec::new("id", "Id")],
            ExportFormat::Csv,
            "unused.csv",
        );
        let headers = export_headers(&request.columns);
        let mut writer = FailingCloseWriter;
        let cancel = AtomicBool::new(false);

        // Rows all written, close fails: the run must resolve to an
        // error so the caller removes the partial artifact.
        let result = drive(request, &headers, &mut writer, &cancel, &mut |_| {});
        assert!(matches!(result, Err(ExportError::Processing(_))));
    }
}
