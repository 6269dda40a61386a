//! SpreadsheetML workbook writer.
//!
//! Emits the 2003 XML workbook format: a single `Worksheet` holding a
//! `Table` of `Row`/`Cell`/`Data` elements. Spreadsheet applications
//! open it directly, and it streams row by row like the CSV path. Cell
//! text is escaped by the XML writer, so commas, quotes, and newlines
//! in data need no special handling here.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use crate::pipeline::ArtifactWriter;
use crate::types::ExportError;

const SPREADSHEET_NS: &str = "urn:schemas-microsoft-com:office:spreadsheet";
const SHEET_NAME: &str = "Export";

/// Streams rows into a single-sheet SpreadsheetML workbook.
pub struct WorkbookWriter {
    xml: Writer<BufWriter<File>>,
}

fn io_err(operation: &str, error: impl std::fmt::Display) -> ExportError {
    ExportError::Processing(format!("{operation}: {error}"))
}

impl WorkbookWriter {
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)
            .map_err(|e| ExportError::Processing(format!("create {}: {e}", path.display())))?;
        let mut xml = Writer::new_with_indent(BufWriter::new(file), b' ', 1);

        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| io_err("write declaration", e))?;
        xml.write_event(Event::PI(BytesPI::new(
            "mso-application progid=\"Excel.Sheet\"",
        )))
        .map_err(|e| io_err("write processing instruction", e))?;

        let mut workbook = BytesStart::new("Workbook");
        workbook.push_attribute(("xmlns", SPREADSHEET_NS));
        workbook.push_attribute(("xmlns:ss", SPREADSHEET_NS));
        xml.write_event(Event::Start(workbook))
            .map_err(|e| io_err("open workbook", e))?;

        let mut worksheet = BytesStart::new("Worksheet");
        worksheet.push_attribute(("ss:Name", SHEET_NAME));
        xml.write_event(Event::Start(worksheet))
            .map_err(|e| io_err("open worksheet", e))?;
        xml.write_event(Event::Start(BytesStart::new("Table")))
            .map_err(|e| io_err("open table", e))?;

        Ok(Self { xml })
    }

    fn write_cells(&mut self, cells: &[String]) -> Result<(), ExportError> {
        self.xml
            .write_event(Event::Start(BytesStart::new("Row")))
            .map_err(|e| io_err("open row", e))?;
        for cell in cells {
            self.xml
                .write_event(Event::Start(BytesStart::new("Cell")))
                .map_err(|e| io_err("open cell", e))?;

            // Numeric text gets a Number cell so spreadsheets treat it
            // as a value instead of a label.
            let cell_type = if !cell.is_empty() && cell.parse::<f64>().is_ok() {
                "Number"
            } else {
                "String"
            };
            let mut data = BytesStart::new("Data");
            data.push_attribute(("ss:Type", cell_type));
            self.xml
                .write_event(Event::Start(data))
                .map_err(|e| io_err("open data", e))?;
            self.xml
                .write_event(Event::Text(BytesText::new(cell)))
                .map_err(|e| io_err("write data", e))?;
            self.xml
                .write_event(Event::End(BytesEnd::new("Data")))
                .map_err(|e| io_err("close data", e))?;
            self.xml
                .write_event(Event::End(BytesEnd::new("Cell")))
                .map_err(|e| io_err("close cell", e))?;
        }
        self.xml
            .write_event(Event::End(BytesEnd::new("Row")))
            .map_err(|e| io_err("close row", e))
    }
}

impl ArtifactWriter for WorkbookWriter {
    fn write_header(&mut self, headers: &[String]) -> Result<(), ExportError> {
        self.write_cells(headers)
    }

    fn write_row(&mut self, cells: &[String]) -> Result<(), ExportError> {
        self.write_cells(cells)
    }

    fn finish(&mut self) -> Result<(), ExportError> {
        for name in ["Table", "Worksheet", "Workbook"] {
            self.xml
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| io_err("close workbook", e))?;
        }
        Ok(())
    }
}
