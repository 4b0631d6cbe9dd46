// ==============================================================================
// evidence/source.rs - Clinical Evidence Source Capability
// ==============================================================================
// Description: Trait for fetching ClinVar documents, injected into the aggregator
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use async_trait::async_trait;
use thiserror::Error;

use super::document::{Document, DocumentError};

/// Errors raised while fetching evidence documents
#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Request for {accession} failed: {source}")]
    Transport {
        accession: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request for {accession} returned HTTP {status}")]
    Status { accession: String, status: u16 },

    #[error("Unreadable document for {accession}: {source}")]
    MalformedDocument {
        accession: String,
        #[source]
        source: DocumentError,
    },
}

impl EvidenceError {
    /// Accession the failed request was made for
    pub fn accession(&self) -> &str {
        match self {
            EvidenceError::Transport { accession, .. }
            | EvidenceError::Status { accession, .. }
            | EvidenceError::MalformedDocument { accession, .. } => accession,
        }
    }
}

/// Source of ClinVar documents
///
/// Implementations return parsed, path-addressable documents; the aggregator
/// does all field extraction. Both calls must be safe to run concurrently for
/// different accessions.
#[async_trait]
pub trait ClinicalEvidenceSource: Send + Sync {
    /// Variant summary listing the submission groups (RCV accessions) of a variant
    async fn variant_summary(&self, variant_accession: &str) -> Result<Document, EvidenceError>;

    /// Full assertion set of one submission group
    async fn submission_group(&self, group_accession: &str) -> Result<Document, EvidenceError>;
}

#[async_trait]
impl<S: ClinicalEvidenceSource + ?Sized> ClinicalEvidenceSource for &S {
    async fn variant_summary(&self, variant_accession: &str) -> Result<Document, EvidenceError> {
        (**self).variant_summary(variant_accession).await
    }

    async fn submission_group(&self, group_accession: &str) -> Result<Document, EvidenceError> {
        (**self).submission_group(group_accession).await
    }
}
