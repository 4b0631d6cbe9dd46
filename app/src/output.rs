// ==============================================================================
// output.rs - Triage Output Generation
// ==============================================================================
// Description: Writes enriched variants as a report spreadsheet or JSON document
// Author: Matt Barham
// Created: 2025-11-06
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// CSV/XLSX layout: the input's two header rows and cells, with eight columns appended
//   row 1: ... | Additional Information | | | Publication Summary | ...
//   row 2: ... | Reference Codes | Phenotype | Disease Definition | ...
// ==============================================================================

use anyhow::{Context, Result};
use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::models::{parse_fraction, EnrichedRecord, ReportedEvidence};
use crate::parsers::ReportHeaders;
use crate::processor::TriageReport;

/// Labels of the appended columns, in order
pub const APPENDED_COLUMNS: [&str; 8] = [
    "Reference Codes",
    "Phenotype",
    "Disease Definition",
    "Submitted Classification",
    "Submitted Date Updated",
    "Submitter",
    "Submitted Assembly",
    "Variant Summary",
];

const ADDITIONAL_INFORMATION: &str = "Additional Information";
const PUBLICATION_SUMMARY: &str = "Publication Summary";
/// Offset of "Publication Summary" within the appended block
const PUBLICATION_SUMMARY_OFFSET: usize = 3;
const WORKSHEET_NAME: &str = "Sheet 1";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Input spreadsheet with evidence columns appended
    #[default]
    Csv,
    /// Structured triage report
    Json,
    /// Excel workbook with evidence columns appended
    Xlsx,
}

impl OutputFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
        }
    }

    /// Format named by a file extension, if any
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            "xlsx" => Some(OutputFormat::Xlsx),
            _ => None,
        }
    }
}

/// Write a triage report to `path` in the requested format
pub fn write_report(
    path: &Path,
    format: OutputFormat,
    headers: &ReportHeaders,
    report: &TriageReport,
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(create(path)?, headers, &report.records)?,
        OutputFormat::Json => write_json(create(path)?, report)?,
        OutputFormat::Xlsx => write_xlsx(path, headers, &report.records)?,
    }

    info!(
        "Wrote {} records as {:?} to {}",
        report.records.len(),
        format,
        path.display()
    );
    Ok(())
}

/// Reproduce the input rows of surviving records with evidence appended
pub fn write_csv<W: Write>(writer: W, headers: &ReportHeaders, records: &[EnrichedRecord]) -> Result<()> {
    let width = headers.width();
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);

    let mut group_row = fit(&headers.groups, width);
    let mut block = vec![String::new(); APPENDED_COLUMNS.len()];
    block[0] = ADDITIONAL_INFORMATION.to_string();
    block[PUBLICATION_SUMMARY_OFFSET] = PUBLICATION_SUMMARY.to_string();
    group_row.extend(block);
    csv_writer.write_record(&group_row)?;

    let mut column_row = fit(&headers.columns, width);
    column_row.extend(APPENDED_COLUMNS.iter().map(|c| c.to_string()));
    csv_writer.write_record(&column_row)?;

    for enriched in records {
        let mut row = fit(&enriched.record.cells, width);
        row.extend(appended_cells(enriched));
        csv_writer
            .write_record(&row)
            .with_context(|| format!("Failed to write row {}", enriched.record.row_number))?;
    }

    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write the report as a single-sheet workbook
///
/// Header rows are bold. Input cells holding a finite number are written as
/// numbers so the sheet keeps its numeric columns.
pub fn write_xlsx(path: &Path, headers: &ReportHeaders, records: &[EnrichedRecord]) -> Result<()> {
    let width = headers.width();
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(WORKSHEET_NAME)?;

    let mut group_row = fit(&headers.groups, width);
    group_row.resize(width + APPENDED_COLUMNS.len(), String::new());
    group_row[width] = ADDITIONAL_INFORMATION.to_string();
    group_row[width + PUBLICATION_SUMMARY_OFFSET] = PUBLICATION_SUMMARY.to_string();

    let mut column_row = fit(&headers.columns, width);
    column_row.extend(APPENDED_COLUMNS.iter().map(|c| c.to_string()));

    for (row, cells) in [group_row, column_row].iter().enumerate() {
        for (col, text) in cells.iter().enumerate() {
            if !text.is_empty() {
                sheet.write_string_with_format(row as u32, column(col)?, text, &bold)?;
            }
        }
    }

    for (index, enriched) in records.iter().enumerate() {
        let row = u32::try_from(index + 2).context("Too many rows for a worksheet")?;
        write_cells(sheet, row, 0, &fit(&enriched.record.cells, width), true)
            .with_context(|| format!("Failed to write row {}", enriched.record.row_number))?;
        write_cells(sheet, row, width, &appended_cells(enriched), false)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook: {}", path.display()))?;
    Ok(())
}

fn write_cells(
    sheet: &mut Worksheet,
    row: u32,
    first_col: usize,
    cells: &[String],
    numeric: bool,
) -> Result<()> {
    for (offset, text) in cells.iter().enumerate() {
        if text.is_empty() {
            continue;
        }
        let col = column(first_col + offset)?;
        match parse_fraction(text).filter(|_| numeric) {
            Some(value) => sheet.write_number(row, col, value)?,
            None => sheet.write_string(row, col, text)?,
        };
    }
    Ok(())
}

fn column(index: usize) -> Result<u16> {
    u16::try_from(index).context("Too many columns for a worksheet")
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Write the whole triage report as pretty-printed JSON
pub fn write_json<W: Write>(writer: W, report: &TriageReport) -> Result<()> {
    serde_json::to_writer_pretty(writer, report).context("Failed to serialize triage report")
}

/// Cells padded or cut to the report width so appended columns line up
fn fit(cells: &[String], width: usize) -> Vec<String> {
    let mut row: Vec<String> = cells.iter().take(width).cloned().collect();
    row.resize(width, String::new());
    row
}

fn appended_cells(enriched: &EnrichedRecord) -> [String; 8] {
    let (codes, phenotype) = enriched
        .phenotype
        .as_ref()
        .map(|p| (p.reference_codes.clone(), p.name.clone()))
        .unwrap_or_default();

    match enriched.evidence.reported() {
        Some(ReportedEvidence {
            disease_definition,
            classification,
            date_updated,
            submitter,
            submitted_assembly,
            summary,
        }) => [
            codes,
            phenotype,
            disease_definition.clone().unwrap_or_default(),
            classification.clone(),
            date_updated.clone(),
            submitter.clone(),
            submitted_assembly.clone(),
            summary.clone(),
        ],
        None => [
            codes,
            phenotype,
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ],
    }
}
