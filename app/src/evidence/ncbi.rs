// ==============================================================================
// evidence/ncbi.rs - NCBI E-utilities ClinVar Source
// ==============================================================================
// Description: Fetches ClinVar variant summaries and RCV assertion sets over HTTP
// Author: Matt Barham
// Created: 2026-10-19
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Endpoints:
//   esummary: {base}/esummary.fcgi?db=clinvar&id={variation id}
//   efetch:   {base}/efetch.fcgi?db=clinvar&rettype=clinvarset&id={RCV}
// ==============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, instrument};

use super::document::{parse_xml, Document};
use super::source::{ClinicalEvidenceSource, EvidenceError};
use crate::config::NcbiConfig;

/// ClinVar access through NCBI E-utilities
///
/// Requests are spaced at least `min_request_interval` apart across all
/// callers so concurrent enrichment stays inside NCBI's rate limits.
#[derive(Debug)]
pub struct NcbiClinVarSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    min_request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl NcbiClinVarSource {
    pub fn new(config: &NcbiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("variant-triage/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            min_request_interval: config.min_request_interval(),
            last_request: Mutex::new(None),
        })
    }

    /// Wait until the next request slot is free
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_request_interval {
                sleep(self.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    #[instrument(skip(self, params))]
    async fn get_document(
        &self,
        endpoint: &str,
        accession: &str,
        params: &[(&str, &str)],
    ) -> Result<Document, EvidenceError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut query: Vec<(&str, &str)> = vec![("db", "clinvar"), ("id", accession)];
        query.extend_from_slice(params);
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.as_str()));
        }

        self.pace().await;

        let transport = |source| EvidenceError::Transport {
            accession: accession.to_string(),
            source,
        };

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EvidenceError::Status {
                accession: accession.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        debug!("Fetched {} bytes from {}", body.len(), endpoint);

        parse_xml(&body).map_err(|source| EvidenceError::MalformedDocument {
            accession: accession.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ClinicalEvidenceSource for NcbiClinVarSource {
    async fn variant_summary(&self, variant_accession: &str) -> Result<Document, EvidenceError> {
        self.get_document("esummary.fcgi", variant_accession, &[]).await
    }

    async fn submission_group(&self, group_accession: &str) -> Result<Document, EvidenceError> {
        self.get_document("efetch.fcgi", group_accession, &[("rettype", "clinvarset")])
            .await
    }
}
