// ==============================================================================
// evidence/mod.rs - Clinical Evidence Modules
// ==============================================================================
// Description: ClinVar document access, fetching and evidence aggregation
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

pub mod aggregator;
pub mod document;
pub mod ncbi;
pub mod source;

pub use aggregator::{merge, EvidenceAggregator};
pub use document::{parse_xml, Document, DocumentError, Step};
pub use ncbi::NcbiClinVarSource;
pub use source::{ClinicalEvidenceSource, EvidenceError};
