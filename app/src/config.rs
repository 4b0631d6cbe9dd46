// ==============================================================================
// config.rs - Triage Configuration
// ==============================================================================
// Description: Report column layout, zygosity limits and evidence fetch settings
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default NCBI E-utilities endpoint
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid column layout: {0}")]
    InvalidLayout(#[from] serde_json::Error),
}

/// Zero-based column positions of the fields the triage reads
///
/// Defaults match the WGS report export the tool was built against. A JSON
/// file with any subset of these keys overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub chromosome: usize,
    pub position: usize,
    pub variant_id: usize,
    pub variant_allele_frequency: usize,
    pub read_depth: usize,
    pub genes: usize,
    pub sequence_ontology: usize,
    pub clinvar_accession: usize,
    pub clinvar_classification: usize,
    pub clinvar_aggregated_classification: usize,
    pub gnomad_alt_allele_frequency: usize,
    pub homozygous_count: usize,
    pub hemizygous_count: usize,
    /// Column DK in the spreadsheet export
    pub acmg_classification: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            chromosome: 0,
            position: 1,
            variant_id: 2,
            variant_allele_frequency: 4,
            read_depth: 6,
            genes: 29,
            sequence_ontology: 31,
            clinvar_accession: 57,
            clinvar_classification: 58,
            clinvar_aggregated_classification: 59,
            gnomad_alt_allele_frequency: 77,
            homozygous_count: 78,
            hemizygous_count: 79,
            acmg_classification: 114,
        }
    }
}

impl ColumnLayout {
    /// Load a layout override from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Exclusive upper bounds on population zygosity counts per inheritance mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZygosityThresholds {
    /// AR and SD genes: homozygous count must stay below this
    pub recessive_homozygous_limit: u64,
    /// AD genes: homozygous count must stay below this
    pub dominant_homozygous_limit: u64,
    /// XL genes: hemizygous count must stay below this
    pub x_linked_hemizygous_limit: u64,
}

impl Default for ZygosityThresholds {
    fn default() -> Self {
        Self {
            recessive_homozygous_limit: 5,
            dominant_homozygous_limit: 1,
            // Earlier revisions used 5 here; the current rule is < 1.
            x_linked_hemizygous_limit: 1,
        }
    }
}

impl ZygosityThresholds {
    pub fn with_x_linked_limit(mut self, limit: u64) -> Self {
        self.x_linked_hemizygous_limit = limit;
        self
    }
}

/// What the pipeline does when evidence for one record cannot be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchFailurePolicy {
    /// Keep the record without evidence and carry on
    #[default]
    Skip,
    /// Stop the run with an error naming the record
    Abort,
}

/// Settings for the NCBI E-utilities evidence source
#[derive(Debug, Clone)]
pub struct NcbiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EUTILS_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl NcbiConfig {
    /// Minimum spacing between requests (NCBI allows 3/s anonymously, 10/s with a key)
    pub fn min_request_interval(&self) -> Duration {
        if self.api_key.is_some() {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(350)
        }
    }
}
