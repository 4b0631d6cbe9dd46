// ==============================================================================
// models.rs - Variant Triage Data Models
// ==============================================================================
// Description: Data structures for WGS variant records, phenotypes and evidence
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ColumnLayout;

/// Mode of inheritance attached to a gene panel phenotype
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inheritance {
    /// Autosomal recessive
    AR,
    /// Autosomal dominant
    AD,
    /// X-linked
    XL,
    /// Semi-dominant
    SD,
    /// Anything the panel carries that is not one of the above
    Other(String),
}

impl Inheritance {
    pub fn as_str(&self) -> &str {
        match self {
            Inheritance::AR => "AR",
            Inheritance::AD => "AD",
            Inheritance::XL => "XL",
            Inheritance::SD => "SD",
            Inheritance::Other(raw) => raw,
        }
    }
}

impl From<&str> for Inheritance {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "AR" => Inheritance::AR,
            "AD" => Inheritance::AD,
            "XL" => Inheritance::XL,
            "SD" => Inheritance::SD,
            _ => Inheritance::Other(trimmed.to_string()),
        }
    }
}

impl FromStr for Inheritance {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Inheritance::from(s))
    }
}

impl fmt::Display for Inheritance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Disease phenotype associated with a panel gene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    /// Phenotype name (e.g., "Hereditary Breast Cancer")
    pub name: String,

    /// Inheritance pattern used for the zygosity rule
    pub inheritance: Inheritance,

    /// Reference codes as listed in the panel (e.g., OMIM "604370")
    pub reference_codes: String,
}

/// One variant call read from a WGS report row
///
/// Classification and sequence ontology text is lower-cased on read so the
/// filter rules can match on plain substrings. Numeric fields that are absent
/// or do not parse are stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// 1-based row number in the source report (headers included)
    pub row_number: usize,

    pub chromosome: String,
    pub position: String,

    /// Variant identifier as reported (e.g., dbSNP rsID)
    pub variant_id: String,

    pub read_depth: Option<u64>,

    /// Raw VAF cell; several comma-delimited values mean a multi-allelic call
    pub variant_allele_frequencies: String,

    pub gnomad_alt_allele_frequency: Option<f64>,

    /// Lower-cased sequence ontology terms
    pub sequence_ontology: String,

    pub clinvar_classification: String,
    pub clinvar_aggregated_classification: String,
    pub acmg_classification: String,

    /// Gene symbols in listed order
    pub genes: Vec<String>,

    pub homozygous_count: Option<u64>,
    pub hemizygous_count: Option<u64>,

    /// ClinVar variation accession used for evidence lookup
    pub clinvar_accession: Option<String>,

    /// Original cells, reproduced verbatim in the output
    #[serde(skip)]
    pub cells: Vec<String>,
}

impl VariantRecord {
    /// Build a record from the raw cells of one report row
    ///
    /// Never fails: missing cells read as empty text, and numbers that do not
    /// parse become `None` so the filter chain treats them as unsatisfied.
    pub fn from_cells(row_number: usize, cells: Vec<String>, layout: &ColumnLayout) -> Self {
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim()).unwrap_or("");

        let genes = cell(layout.genes)
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(String::from)
            .collect();

        let clinvar_accession = Some(cell(layout.clinvar_accession))
            .filter(|id| !id.is_empty())
            .map(String::from);

        Self {
            row_number,
            chromosome: cell(layout.chromosome).to_string(),
            position: cell(layout.position).to_string(),
            variant_id: cell(layout.variant_id).to_string(),
            read_depth: parse_count(cell(layout.read_depth)),
            variant_allele_frequencies: cell(layout.variant_allele_frequency).to_string(),
            gnomad_alt_allele_frequency: parse_fraction(cell(layout.gnomad_alt_allele_frequency)),
            sequence_ontology: cell(layout.sequence_ontology).to_lowercase(),
            clinvar_classification: cell(layout.clinvar_classification).to_lowercase(),
            clinvar_aggregated_classification: cell(layout.clinvar_aggregated_classification)
                .to_lowercase(),
            acmg_classification: cell(layout.acmg_classification).to_lowercase(),
            genes,
            homozygous_count: parse_count(cell(layout.homozygous_count)),
            hemizygous_count: parse_count(cell(layout.hemizygous_count)),
            clinvar_accession,
            cells,
        }
    }

    /// Individual VAF values, blanks dropped
    pub fn vaf_values(&self) -> Vec<&str> {
        self.variant_allele_frequencies
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Parse a non-negative integer count
///
/// Spreadsheet exports often render integers as "35.0", so integral floats
/// are accepted as well.
pub fn parse_count(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
        .map(|v| v as u64)
}

/// Parse a finite fractional value
pub fn parse_fraction(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One clinical submission (ClinVar assertion)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSummary {
    /// Last update; `NaiveDate::MIN` when the source date did not parse
    pub date_updated: NaiveDate,
    pub submitter: String,
    pub submitted_assembly: String,
    /// Lower-cased germline classification
    pub classification: String,
    pub summary: String,
}

impl PublicationSummary {
    /// Date for display; blank when the source date was unusable
    pub fn date_label(&self) -> String {
        if self.date_updated == NaiveDate::MIN {
            String::new()
        } else {
            self.date_updated.format("%Y-%m-%d").to_string()
        }
    }
}

/// Clinical evidence merged across all submission groups of one variant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantClinicalEvidence {
    pub disease_definition: Option<String>,
    pub submissions: Vec<PublicationSummary>,
}

/// Evidence fields written next to a reported variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedEvidence {
    pub disease_definition: Option<String>,
    pub classification: String,
    pub date_updated: String,
    pub submitter: String,
    pub submitted_assembly: String,
    pub summary: String,
}

/// Outcome of the enrichment step for one surviving record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvidenceStatus {
    /// A pathogenic submission with a summary was selected
    Reported(ReportedEvidence),
    /// Evidence was fetched but no submission qualified
    NoQualifyingSubmission,
    /// The record carries no ClinVar accession
    NoAccession,
    /// Fetching evidence failed and the run was configured to continue
    FetchFailed { error: String },
}

impl EvidenceStatus {
    pub fn reported(&self) -> Option<&ReportedEvidence> {
        match self {
            EvidenceStatus::Reported(evidence) => Some(evidence),
            _ => None,
        }
    }
}

/// Variant that passed the filter chain, with its enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub record: VariantRecord,

    /// Panel gene the phenotype was resolved through
    pub gene: Option<String>,
    pub phenotype: Option<Phenotype>,

    pub evidence: EvidenceStatus,
}
