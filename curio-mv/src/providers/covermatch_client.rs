//! CoverMatch recognition client
//!
//! The image-recognition collaborator, consumed as one more provider. It
//! returns descriptive metadata (series, publisher, creator credits, cover
//! image) and key-issue notability, never pricing. The model behind the
//! service is outside this repository; only its payload contract lives
//! here.
//!
//! # API Reference
//! - Endpoint: `POST {base}/v1/identify`
//! - Typically deployed alongside this service; no auth by default

use crate::models::{ItemMetadata, ItemQuery};
use crate::providers::{ProviderError, ProviderPayload, ValuationProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5738";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = concat!("curio-mv/", env!("CARGO_PKG_VERSION"));

/// CoverMatch metadata/recognition client
pub struct CoverMatchClient {
    http_client: Client,
    base_url: String,
}

impl CoverMatchClient {
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn map_match(found: &CoverMatchEntry) -> ProviderPayload {
        let metadata = ItemMetadata {
            series: found.series.clone(),
            publisher: found.publisher.clone(),
            cover_image_url: found.cover_image_url.clone(),
            writer: found.writer.clone(),
            artist: found.artist.clone(),
            release_year: found.release_year,
        };

        ProviderPayload {
            values_by_grade: Default::default(),
            single_estimate: None,
            is_notable: found.key_issue,
            notable_reason: found.key_reason.clone(),
            metadata: (!metadata.is_empty()).then_some(metadata),
        }
    }
}

#[async_trait]
impl ValuationProvider for CoverMatchClient {
    fn name(&self) -> &'static str {
        "CoverMatch"
    }

    async fn query_item(&self, query: &ItemQuery) -> Result<ProviderPayload, ProviderError> {
        let url = format!("{}/v1/identify", self.base_url);
        let request = CoverMatchRequest {
            title: &query.title,
            issue_number: query.issue_number.as_deref(),
            publisher: query.publisher.as_deref(),
        };

        tracing::debug!(title = %query.title, "querying CoverMatch recognition");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ProviderError::NoResults);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CoverMatchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let found = payload.found.ok_or(ProviderError::NoResults)?;
        let mapped = Self::map_match(&found);
        if mapped.metadata.is_none() && mapped.is_notable.is_none() {
            return Err(ProviderError::NoResults);
        }

        Ok(mapped)
    }
}

// ============================================================================
// CoverMatch API request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct CoverMatchRequest<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issue_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CoverMatchResponse {
    #[serde(rename = "match")]
    found: Option<CoverMatchEntry>,
    #[allow(dead_code)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoverMatchEntry {
    series: Option<String>,
    publisher: Option<String>,
    cover_image_url: Option<String>,
    writer: Option<String>,
    artist: Option<String>,
    release_year: Option<i32>,
    key_issue: Option<bool>,
    key_reason: Option<String>,
}
