//! Chunked, cancellable export pipeline for the data-grid engine.
//!
//! Exports stream projected rows (visible columns, display formatting)
//! into a CSV or SpreadsheetML artifact, either from resident rows or
//! page by page through a host callback. Runs report progress, honor a
//! cancel flag, and clean up partial files on failure or abort.

pub mod delimited;
pub mod pipeline;
pub mod projection;
pub mod types;
pub mod workbook;

pub use delimited::CsvWriter;
pub use pipeline::{
    ArtifactWriter, ExportPage, ExportRequest, ExportSource, PageFetcher, run_export, spawn_export,
};
pub use projection::{export_headers, project_row};
pub use types::{
    ExportError, ExportErrorKind, ExportFormat, ExportHandle, ExportProgress, ExportResult,
    ExportUpdate,
};
pub use workbook::WorkbookWriter;
