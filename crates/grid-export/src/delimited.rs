//! CSV artifact writer.

use std::fs::File;
use std::path::Path;

use crate::pipeline::ArtifactWriter;
use crate::types::ExportError;

/// Streams rows to a CSV file with RFC 4180 quoting.
pub struct CsvWriter {
    inner: csv::Writer<File>,
}

impl CsvWriter {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)
            .map_err(|e| ExportError::Processing(format!("create {}: {e}", path.display())))?;
        Ok(Self {
            inner: csv::Writer::from_writer(file),
        })
    }
}

impl ArtifactWriter for CsvWriter {
    fn write_header(&mut self, headers: &[String]) -> Result<(), ExportError> {
        self.inner
            .write_record(headers)
            .map_err(|e| ExportError::Processing(format!("write header: {e}")))
    }

    fn write_row(&mut self, cells: &[String]) -> Result<(), ExportError> {
        self.inner
            .write_record(cells)
            .map_err(|e| ExportError::Processing(format!("write row: {e}")))
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        self.inner
            .flush()
            .map_err(|e| ExportError::Processing(format!("flush: {e}")))
    }
}
