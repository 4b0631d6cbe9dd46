// ==============================================================================
// processor.rs - Variant Triage Pipeline
// ==============================================================================
// Description: Filters report records and enriches survivors with ClinVar evidence
// Author: Matt Barham
// Created: 2025-10-31
// Modified: 2026-10-19
// Version: 3.0.0
// ==============================================================================
// Stages:
//   1. Filter every record through the rule chain, in input order
//   2. Resolve the panel phenotype of each survivor
//   3. Collect ClinVar evidence for survivors (bounded concurrency, order kept)
// ==============================================================================

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{FetchFailurePolicy, ZygosityThresholds};
use crate::evidence::{ClinicalEvidenceSource, EvidenceAggregator, EvidenceError};
use crate::filters::{AmbiguousValue, Rule, VariantFilterChain};
use crate::gene_panel::GenePanel;
use crate::models::{EnrichedRecord, EvidenceStatus, VariantRecord};
use crate::parsers::ReportParseError;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Failed to read report: {0}")]
    Report(#[from] ReportParseError),

    #[error("Evidence fetch failed for row {row} (ClinVar accession {accession}): {source}")]
    ExternalFetch {
        row: usize,
        accession: String,
        #[source]
        source: EvidenceError,
    },
}

/// Outcome of one triage run
#[derive(Debug, Clone, Serialize)]
pub struct TriageReport {
    pub run_id: Uuid,
    pub total_records: usize,
    /// Rejections keyed by the first rule each record failed
    pub rejected: BTreeMap<Rule, usize>,
    pub ambiguous: Vec<AmbiguousValue>,
    pub enrichment_failures: usize,
    pub records: Vec<EnrichedRecord>,
}

impl TriageReport {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

pub struct TriagePipeline<'a, S> {
    panel: &'a GenePanel,
    chain: VariantFilterChain<'a>,
    aggregator: EvidenceAggregator<S>,
    policy: FetchFailurePolicy,
    concurrency: usize,
}

impl<'a, S: ClinicalEvidenceSource> TriagePipeline<'a, S> {
    pub fn new(panel: &'a GenePanel, thresholds: ZygosityThresholds, source: S) -> Self {
        Self {
            panel,
            chain: VariantFilterChain::new(panel, thresholds),
            aggregator: EvidenceAggregator::new(source),
            policy: FetchFailurePolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Maximum evidence collections in flight; 1 runs them strictly in sequence
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Triage a stream of report records
    pub async fn run<I>(&self, records: I) -> Result<TriageReport, TriageError>
    where
        I: IntoIterator<Item = Result<VariantRecord, ReportParseError>>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("triage", run_id = %run_id);

        async move {
            info!(
                "Starting triage against {} panel genes (fetch failures: {:?}, concurrency: {})",
                self.panel.len(),
                self.policy,
                self.concurrency
            );

            let mut total_records = 0;
            let mut rejected: BTreeMap<Rule, usize> = BTreeMap::new();
            let mut ambiguous = Vec::new();
            let mut survivors = Vec::new();

            for record in records {
                let record = record?;
                total_records += 1;

                let verdict = self.chain.evaluate(&record);
                match verdict.rejected_by {
                    Some(rule) => {
                        *rejected.entry(rule).or_insert(0) += 1;
                        ambiguous.extend(verdict.diagnostic);
                    }
                    None => survivors.push(record),
                }
            }

            info!(
                "Filtered {} records: {} passed, {} rejected",
                total_records,
                survivors.len(),
                total_records - survivors.len()
            );
            for (rule, count) in &rejected {
                info!("  {}: {} rejected", rule, count);
            }

            let enriched: Vec<EnrichedRecord> = stream::iter(survivors)
                .map(|record| self.enrich(record))
                .buffered(self.concurrency)
                .try_collect()
                .await?;

            let enrichment_failures = enriched
                .iter()
                .filter(|r| matches!(r.evidence, EvidenceStatus::FetchFailed { .. }))
                .count();

            info!(
                "Triage complete: {} enriched records ({} with reportable evidence, {} fetch failures)",
                enriched.len(),
                enriched.iter().filter(|r| r.evidence.reported().is_some()).count(),
                enrichment_failures
            );

            Ok(TriageReport {
                run_id,
                total_records,
                rejected,
                ambiguous,
                enrichment_failures,
                records: enriched,
            })
        }
        .instrument(span)
        .await
    }

    /// Attach phenotype and clinical evidence to a record that passed the chain
    async fn enrich(&self, record: VariantRecord) -> Result<EnrichedRecord, TriageError> {
        let (gene, phenotype) = match self.panel.resolve(&record.genes) {
            Some((gene, phenotype)) => (Some(gene.to_string()), Some(phenotype.clone())),
            None => (None, None),
        };

        let evidence = match record.clinvar_accession.as_deref() {
            None => EvidenceStatus::NoAccession,
            Some(accession) => match self.aggregator.collect(accession).await {
                Ok(collected) => match collected.reported() {
                    Some(reported) => EvidenceStatus::Reported(reported),
                    None => {
                        debug!("Row {}: no qualifying submission for {}", record.row_number, accession);
                        EvidenceStatus::NoQualifyingSubmission
                    }
                },
                Err(source) => match self.policy {
                    FetchFailurePolicy::Skip => {
                        warn!(
                            "Row {}: evidence fetch failed for ClinVar accession {}: {}",
                            record.row_number, accession, source
                        );
                        EvidenceStatus::FetchFailed {
                            error: source.to_string(),
                        }
                    }
                    FetchFailurePolicy::Abort => {
                        return Err(TriageError::ExternalFetch {
                            row: record.row_number,
                            accession: accession.to_string(),
                            source,
                        });
                    }
                },
            },
        };

        Ok(EnrichedRecord {
            record,
            gene,
            phenotype,
            evidence,
        })
    }
}
