// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for annotated variant report exports (workbook or delimited)
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================

pub mod report;

pub use report::{is_workbook, ReportHeaders, ReportParseError, ReportReader};
