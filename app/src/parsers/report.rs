// ==============================================================================
// parsers/report.rs - Annotated Variant Report Parser
// ==============================================================================
// Description: Streams rows of a WGS variant report export as VariantRecords
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.1.0
// ==============================================================================
// Format: Spreadsheet or delimited text with two header rows
//   row 1: column group labels (sparse)
//   row 2: column names
//   row 3+: one variant per row, ~115 columns
// .xlsx/.xlsm/.xlsb/.xls/.ods: first worksheet of the workbook
// Otherwise comma-delimited, tab-delimited for .tsv/.txt, gzip for .gz
// Cells that are not valid UTF-8 are decoded lossily
// ==============================================================================

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ByteRecord, ReaderBuilder};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::ColumnLayout;
use crate::models::VariantRecord;

/// Number of header rows preceding the variant rows
pub const HEADER_ROWS: usize = 2;

/// File extensions read as spreadsheet workbooks
pub const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Errors that can occur while reading a variant report
#[derive(Error, Debug)]
pub enum ReportParseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("Workbook contains no worksheet")]
    NoWorksheet,

    #[error("Report has {found} header rows, expected {}", HEADER_ROWS)]
    MissingHeaders { found: usize },
}

/// The two header rows of a report, reproduced verbatim in the output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportHeaders {
    pub groups: Vec<String>,
    pub columns: Vec<String>,
}

impl ReportHeaders {
    /// Width of the report: the column-name row's cell count
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Raw rows of a report, before header handling
enum Rows {
    Delimited(csv::ByteRecordsIntoIter<Box<dyn Read + Send>>),
    Sheet(std::vec::IntoIter<Vec<String>>),
}

impl Iterator for Rows {
    type Item = Result<Vec<String>, ReportParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Rows::Delimited(records) => Some(
                records
                    .next()?
                    .map(|record| decode_cells(&record))
                    .map_err(ReportParseError::from),
            ),
            Rows::Sheet(rows) => rows.next().map(Ok),
        }
    }
}

/// Lazy, ordered reader over the variant rows of a report
///
/// Header rows are consumed on open; iteration yields one `VariantRecord`
/// per remaining non-blank row.
pub struct ReportReader {
    rows: Rows,
    headers: ReportHeaders,
    layout: ColumnLayout,
    next_row: usize,
}

impl ReportReader {
    /// Open a report file, picking the format from its name
    pub fn open<P: AsRef<Path>>(path: P, layout: ColumnLayout) -> Result<Self, ReportParseError> {
        let path = path.as_ref();

        if is_workbook(path) {
            info!("Reading variant report workbook {}", path.display());
            let mut workbook = open_workbook_auto(path)?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or(ReportParseError::NoWorksheet)??;
            return Self::from_rows(sheet_rows(&range), layout);
        }

        let file = File::open(path)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let (stem, compressed) = match name.strip_suffix(".gz") {
            Some(stem) => (stem.to_string(), true),
            None => (name.clone(), false),
        };

        let source: Box<dyn Read + Send> = if compressed {
            Box::new(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        info!("Reading variant report {}", path.display());
        Self::from_reader(source, delimiter_for(&stem), layout)
    }

    /// Read a delimited report from any byte source
    pub fn from_reader<R: Read + Send + 'static>(
        reader: R,
        delimiter: u8,
        layout: ColumnLayout,
    ) -> Result<Self, ReportParseError> {
        let source: Box<dyn Read + Send> = Box::new(reader);
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(source)
            .into_byte_records();

        Self::with_rows(Rows::Delimited(records), layout)
    }

    /// Read a report from rows of cells already in memory
    pub fn from_rows(rows: Vec<Vec<String>>, layout: ColumnLayout) -> Result<Self, ReportParseError> {
        Self::with_rows(Rows::Sheet(rows.into_iter()), layout)
    }

    fn with_rows(mut rows: Rows, layout: ColumnLayout) -> Result<Self, ReportParseError> {
        let mut header_rows = Vec::with_capacity(HEADER_ROWS);
        while header_rows.len() < HEADER_ROWS {
            match rows.next() {
                Some(row) => header_rows.push(row?),
                None => {
                    return Err(ReportParseError::MissingHeaders {
                        found: header_rows.len(),
                    })
                }
            }
        }

        let columns = header_rows.pop().unwrap_or_default();
        let groups = header_rows.pop().unwrap_or_default();

        Ok(Self {
            rows,
            headers: ReportHeaders { groups, columns },
            layout,
            next_row: HEADER_ROWS + 1,
        })
    }

    pub fn headers(&self) -> &ReportHeaders {
        &self.headers
    }
}

impl Iterator for ReportReader {
    type Item = Result<VariantRecord, ReportParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.rows.next()?;
            let row_number = self.next_row;
            self.next_row += 1;

            match row {
                Ok(cells) if cells.iter().all(|c| c.trim().is_empty()) => continue,
                Ok(cells) => return Some(Ok(VariantRecord::from_cells(row_number, cells, &self.layout))),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Whether a path names a spreadsheet workbook
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.as_str()))
}

/// Field delimiter for a (decompressed) file name
pub fn delimiter_for(file_name: &str) -> u8 {
    if file_name.ends_with(".tsv") || file_name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

fn decode_cells(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Worksheet cells as text, anchored at A1
///
/// calamine trims leading empty rows and columns from a range; they are
/// restored so row and column positions match the sheet.
fn sheet_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    let (first_row, first_col) = range.start().unwrap_or((0, 0));

    let mut rows = vec![Vec::new(); first_row as usize];
    rows.extend(range.rows().map(|row| {
        let mut cells = vec![String::new(); first_col as usize];
        cells.extend(row.iter().map(cell_text));
        cells
    }));
    rows
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        other => other.to_string(),
    }
}
