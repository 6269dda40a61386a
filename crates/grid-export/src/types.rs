//! Export types - configuration, progress, errors, and the cancel handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

// ============================================================================
// Format
// ============================================================================

/// Target artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Delimited text (RFC 4180 quoting).
    #[default]
    Csv,
    /// Single-sheet SpreadsheetML workbook.
    Workbook,
}

impl ExportFormat {
    /// File extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Workbook => "xml",
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Classified export failure, delivered through the update channel.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// The caller aborted; not a failure, but ends the run.
    #[error("export cancelled")]
    Cancelled,

    /// Ran out of memory assembling the artifact.
    #[error("out of memory during export: {0}")]
    Memory(String),

    /// Row processing or artifact writing failed.
    #[error("export processing failed: {0}")]
    Processing(String),

    /// Anything unclassified.
    #[error("export failed: {0}")]
    Unknown(String),
}

/// Error class, for hosts that branch on category rather than message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorKind {
    Cancelled,
    MemoryError,
    ProcessingError,
    Unknown,
}

impl ExportError {
    pub fn kind(&self) -> ExportErrorKind {
        match self {
            Self::Cancelled => ExportErrorKind::Cancelled,
            Self::Memory(_) => ExportErrorKind::MemoryError,
            Self::Processing(_) => ExportErrorKind::ProcessingError,
            Self::Unknown(_) => ExportErrorKind::Unknown,
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing(message.into())
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Progress report: one per row (local) or per page (remote).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportProgress {
    pub processed_rows: u64,
    pub total_rows: u64,
    /// `round(processed / total * 100)`; 100 exactly at completion.
    pub percentage: u8,
}

impl ExportProgress {
    pub fn new(processed_rows: u64, total_rows: u64) -> Self {
        let percentage = if total_rows == 0 {
            100
        } else {
            ((processed_rows * 100 + total_rows / 2) / total_rows) as u8
        };
        Self {
            processed_rows,
            total_rows,
            percentage,
        }
    }
}

// ============================================================================
// Result & Updates
// ============================================================================

/// Successful export outcome.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// Where the artifact was written.
    pub path: PathBuf,
    pub rows_exported: u64,
    pub elapsed_ms: u64,
}

/// Messages sent from the export thread to the caller.
#[derive(Debug, Clone)]
pub enum ExportUpdate {
    Progress(ExportProgress),
    Complete(ExportResult),
    Error(ExportError),
    /// Cancellation outcome: fires instead of `Complete`/`Error`.
    Cancelled,
}

// ============================================================================
// Cancel Handle
// ============================================================================

/// Handle to cancel an in-progress export.
#[derive(Clone, Default)]
pub struct ExportHandle {
    cancel_flag: Arc<AtomicBool>,
}

impl ExportHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Observed before each row/page and
    /// immediately after a page resolves.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::SeqCst)
    }

    /// The raw flag, for sharing with the export thread.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }
}

impl std::fmt::Debug for ExportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportHandle")
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_and_caps() {
        assert_eq!(ExportProgress::new(1, 3).percentage, 33);
        assert_eq!(ExportProgress::new(2, 3).percentage, 67);
        assert_eq!(ExportProgress::new(3, 3).percentage, 100);
        assert_eq!(ExportProgress::new(0, 0).percentage, 100);
    }

    #[test]
    fn error_kinds_classify() {
        assert_eq!(ExportError::Cancelled.kind(), ExportErrorKind::Cancelled);
        assert_eq!(
            ExportError::processing("x").kind(),
            ExportErrorKind::ProcessingError
        );
    }
}
