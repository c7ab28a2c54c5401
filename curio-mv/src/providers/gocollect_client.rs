//! GoCollect client
//!
//! Queries the GoCollect fair-market-value API, the primary market-value
//! service. Returns an FMV ladder keyed by numeric grade plus key-issue
//! notability flags.
//!
//! # API Reference
//! - Endpoint: `{base}/v1/comics/fmv`
//! - Auth: Bearer token
//! - Rate limit: 2 requests/second (courtesy limit)

use crate::models::{valuation::normalize_grade_key, ItemQuery};
use crate::providers::{ProviderError, ProviderPayload, RateLimiter, ValuationProvider};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.gocollect.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(500);
const USER_AGENT: &str = concat!("curio-mv/", env!("CARGO_PKG_VERSION"));

/// GoCollect FMV client
pub struct GoCollectClient {
    http_client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl GoCollectClient {
    /// Create a client with the given API token
    pub fn new(api_token: &str) -> Result<Self, ProviderError> {
        Self::with_base_url(api_token, DEFAULT_BASE_URL)
    }

    /// Create a client against a non-default endpoint (tests, staging)
    pub fn with_base_url(api_token: &str, base_url: &str) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", api_token))
            .map_err(|e| ProviderError::Transport(format!("invalid API token: {}", e)))?;
        headers.insert(header::AUTHORIZATION, auth);

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }

    fn map_item(item: &GoCollectItem) -> ProviderPayload {
        let mut values_by_grade = HashMap::new();
        for (label, value) in &item.fmv_by_grade {
            if let Some(key) = normalize_grade_key(label) {
                values_by_grade.insert(key, *value);
            }
        }

        ProviderPayload {
            values_by_grade,
            single_estimate: None,
            is_notable: item.key_issue,
            notable_reason: item.key_reason.clone(),
            metadata: None,
        }
    }
}

#[async_trait]
impl ValuationProvider for GoCollectClient {
    fn name(&self) -> &'static str {
        "GoCollect"
    }

    async fn query_item(&self, query: &ItemQuery) -> Result<ProviderPayload, ProviderError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/v1/comics/fmv", self.base_url);
        let mut params: Vec<(&str, String)> = vec![("title", query.title.clone())];
        if let Some(issue) = &query.issue_number {
            params.push(("issue", issue.clone()));
        }
        if let Some(publisher) = &query.publisher {
            params.push(("publisher", publisher.clone()));
        }
        if let Some(cert) = &query.cert_number {
            params.push(("cert", cert.clone()));
        }

        tracing::debug!(title = %query.title, "querying GoCollect FMV");

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GoCollectResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let item = payload.results.first().ok_or(ProviderError::NoResults)?;
        let mapped = Self::map_item(item);
        if mapped.values_by_grade.is_empty() && mapped.is_notable.is_none() {
            return Err(ProviderError::NoResults);
        }

        Ok(mapped)
    }
}

// ============================================================================
// GoCollect API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GoCollectResponse {
    #[serde(default)]
    results: Vec<GoCollectItem>,
}

#[derive(Debug, Deserialize)]
struct GoCollectItem {
    #[allow(dead_code)]
    title: Option<String>,
    #[serde(default)]
    fmv_by_grade: HashMap<String, f64>,
    #[serde(default)]
    key_issue: Option<bool>,
    #[serde(default)]
    key_reason: Option<String>,
}
