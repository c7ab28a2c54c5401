//! PriceCharting client
//!
//! Queries the PriceCharting product API, the secondary price-guide
//! service. Returns guide values by grade plus a "current" catch-all when
//! no grade-specific breakdown exists.
//!
//! # API Reference
//! - Endpoint: `{base}/api/product?t={token}&q={query}`
//! - Prices are reported in pennies and converted to dollars here
//! - Rate limit: 1 request/second per their API guidelines

use crate::models::{valuation::normalize_grade_key, ItemQuery};
use crate::providers::{ProviderError, ProviderPayload, RateLimiter, ValuationProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.pricecharting.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1000);
const USER_AGENT: &str = concat!("curio-mv/", env!("CARGO_PKG_VERSION"));

/// PriceCharting guide client
pub struct PriceChartingClient {
    http_client: Client,
    base_url: String,
    api_token: String,
    rate_limiter: RateLimiter,
}

impl PriceChartingClient {
    pub fn new(api_token: &str) -> Result<Self, ProviderError> {
        Self::with_base_url(api_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_token: &str, base_url: &str) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            rate_limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }

    /// Convert the pennies-keyed guide table into dollar grade buckets
    fn map_product(product: &PriceChartingProduct) -> ProviderPayload {
        let mut values_by_grade = HashMap::new();
        for (label, pennies) in &product.prices {
            if let Some(key) = normalize_grade_key(label) {
                values_by_grade.insert(key, *pennies as f64 / 100.0);
            }
        }

        ProviderPayload {
            values_by_grade,
            single_estimate: product.current_price.map(|p| p as f64 / 100.0),
            is_notable: None,
            notable_reason: None,
            metadata: None,
        }
    }

    fn search_term(query: &ItemQuery) -> String {
        match &query.issue_number {
            Some(issue) => format!("{} #{}", query.title, issue),
            None => query.title.clone(),
        }
    }
}

#[async_trait]
impl ValuationProvider for PriceChartingClient {
    fn name(&self) -> &'static str {
        "PriceCharting"
    }

    async fn query_item(&self, query: &ItemQuery) -> Result<ProviderPayload, ProviderError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/api/product", self.base_url);
        let term = Self::search_term(query);

        tracing::debug!(q = %term, "querying PriceCharting guide");

        let response = self
            .http_client
            .get(&url)
            .query(&[("t", self.api_token.as_str()), ("q", term.as_str())])
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

        let product: PriceChartingProduct = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if product.status != "success" {
            return Err(ProviderError::NoResults);
        }

        let mapped = Self::map_product(&product);
        if mapped.values_by_grade.is_empty() && mapped.single_estimate.is_none() {
            return Err(ProviderError::NoResults);
        }

        Ok(mapped)
    }
}

// ============================================================================
// PriceCharting API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct PriceChartingProduct {
    status: String,
    #[serde(rename = "product-name")]
    #[allow(dead_code)]
    product_name: Option<String>,
    /// Guide prices by grade label, in pennies
    #[serde(default)]
    prices: HashMap<String, i64>,
    /// Catch-all market price, in pennies
    #[serde(rename = "current-price")]
    #[serde(default)]
    current_price: Option<i64>,
}
