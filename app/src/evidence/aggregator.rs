// ==============================================================================
// evidence/aggregator.rs - Clinical Evidence Aggregation
// ==============================================================================
// Description: Merges ClinVar submission groups and selects reportable evidence
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Algorithm:
//   1. Variant summary -> RCV accessions (one per submission group)
//   2. Each RCV assertion set -> disease definition + one summary per assertion
//   3. Fold groups in order: concatenate submissions, first non-blank
//      disease definition wins
//   4. Report the newest "pathogenic" submission that has a summary
// ==============================================================================

use chrono::NaiveDate;
use tracing::{debug, instrument};

use super::document::{items, path, text, text_at, Document, Step};
use super::source::{ClinicalEvidenceSource, EvidenceError};
use crate::models::{PublicationSummary, ReportedEvidence, VariantClinicalEvidence};

use Step::{Index, Key};

const RCV_ACCESSIONS: &[Step<'static>] = &[
    Key("DocumentSummarySet"),
    Key("DocumentSummary"),
    Key("supporting_submissions"),
    Key("rcv"),
    Key("string"),
];

const DISEASE_DEFINITION: &[Step<'static>] = &[
    Key("ClinVarSet"),
    Key("ReferenceClinVarAssertion"),
    Key("TraitSet"),
    Key("Trait"),
    Index(0),
    Key("AttributeSet"),
    Key("Attribute"),
    Index(0),
];

const ASSERTIONS: &[Step<'static>] = &[Key("ClinVarSet"), Key("ClinVarAssertion")];

const DATE_UPDATED: &[Step<'static>] = &[Key("ClinVarAccession"), Key("DateUpdated")];
const SUBMITTER: &[Step<'static>] = &[Key("ClinVarSubmissionID"), Key("submitter")];
const SUBMITTED_ASSEMBLY: &[Step<'static>] =
    &[Key("ClinVarSubmissionID"), Key("submittedAssembly")];

const CLASSIFICATION_NODE: &[Step<'static>] = &[Key("Classification")];
const GERMLINE_CLASSIFICATION: &[Step<'static>] =
    &[Key("Classification"), Key("GermlineClassification")];
const CLASSIFICATION_COMMENT: &[Step<'static>] = &[Key("Classification"), Key("Comment")];

// Pre-2024 ClinVar XML
const LEGACY_DESCRIPTION: &[Step<'static>] =
    &[Key("ClinicalSignificance"), Key("Description")];
const LEGACY_COMMENT: &[Step<'static>] = &[Key("ClinicalSignificance"), Key("Comment")];

const REPORTABLE_CLASSIFICATION: &str = "pathogenic";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds merged clinical evidence for a variant from an injected source
#[derive(Debug, Clone)]
pub struct EvidenceAggregator<S> {
    source: S,
}

impl<S: ClinicalEvidenceSource> EvidenceAggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch and merge every submission group of one variant
    ///
    /// Any failed fetch fails the whole variant; nothing is partially merged.
    #[instrument(skip(self))]
    pub async fn collect(&self, variant_accession: &str) -> Result<VariantClinicalEvidence, EvidenceError> {
        let summary = self.source.variant_summary(variant_accession).await?;
        let accessions = submission_group_accessions(&summary);
        debug!("Variant {} has {} submission groups", variant_accession, accessions.len());

        let mut groups = Vec::with_capacity(accessions.len());
        for accession in &accessions {
            let document = self.source.submission_group(accession).await?;
            groups.push(extract_submission_group(&document));
        }

        Ok(merge(groups))
    }
}

/// RCV accessions listed in a variant summary document
pub fn submission_group_accessions(summary: &Document) -> Vec<String> {
    items(path(summary, RCV_ACCESSIONS))
        .into_iter()
        .map(text)
        .map(|accession| accession.trim().to_string())
        .filter(|accession| !accession.is_empty())
        .collect()
}

/// Disease definition and submissions of one RCV assertion set
pub fn extract_submission_group(document: &Document) -> VariantClinicalEvidence {
    let submissions = items(path(document, ASSERTIONS))
        .into_iter()
        .map(extract_publication)
        .collect();

    VariantClinicalEvidence {
        disease_definition: Some(text_at(document, DISEASE_DEFINITION).trim().to_string()),
        submissions,
    }
}

fn extract_publication(assertion: &Document) -> PublicationSummary {
    let has_classification = !path(assertion, CLASSIFICATION_NODE).is_null();
    let (classification, summary) = if has_classification {
        (
            text_at(assertion, GERMLINE_CLASSIFICATION),
            text_at(assertion, CLASSIFICATION_COMMENT),
        )
    } else {
        (
            text_at(assertion, LEGACY_DESCRIPTION),
            text_at(assertion, LEGACY_COMMENT),
        )
    };

    PublicationSummary {
        date_updated: parse_date(&text_at(assertion, DATE_UPDATED)),
        submitter: text_at(assertion, SUBMITTER),
        submitted_assembly: text_at(assertion, SUBMITTED_ASSEMBLY),
        classification: classification.trim().to_lowercase(),
        summary: summary.trim().to_string(),
    }
}

/// Parse a submission date; unusable dates sort before every real one
pub fn parse_date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).unwrap_or(NaiveDate::MIN)
}

/// Fold submission groups in order into one evidence record
pub fn merge<I>(groups: I) -> VariantClinicalEvidence
where
    I: IntoIterator<Item = VariantClinicalEvidence>,
{
    groups
        .into_iter()
        .fold(VariantClinicalEvidence::default(), |mut merged, group| {
            let keep_current = merged
                .disease_definition
                .as_deref()
                .is_some_and(|definition| !definition.trim().is_empty());
            if !keep_current {
                merged.disease_definition = group.disease_definition;
            }
            merged.submissions.extend(group.submissions);
            merged
        })
}

impl VariantClinicalEvidence {
    /// Newest pathogenic submission with a summary
    ///
    /// Ties on date go to the submission listed first.
    pub fn select_reportable(&self) -> Option<&PublicationSummary> {
        self.submissions
            .iter()
            .filter(|s| s.classification == REPORTABLE_CLASSIFICATION)
            .filter(|s| !s.summary.trim().is_empty())
            .rev()
            .max_by_key(|s| s.date_updated)
    }

    /// Evidence fields for the output, when a submission qualifies
    pub fn reported(&self) -> Option<ReportedEvidence> {
        self.select_reportable().map(|selected| ReportedEvidence {
            disease_definition: self
                .disease_definition
                .clone()
                .filter(|definition| !definition.trim().is_empty()),
            classification: selected.classification.clone(),
            date_updated: selected.date_label(),
            submitter: selected.submitter.clone(),
            submitted_assembly: selected.submitted_assembly.clone(),
            summary: selected.summary.clone(),
        })
    }
}
