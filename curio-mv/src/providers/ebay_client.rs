//! eBay marketplace estimate client
//!
//! Searches recent sold listings through the eBay Browse API and condenses
//! them into one `single_estimate`. eBay reports no grade breakdown, so the
//! estimate lands in the "current" catch-all bucket downstream.
//!
//! # API Reference
//! - Endpoint: `{base}/buy/browse/v1/item_summary/search`
//! - Auth: OAuth application token (Bearer)

use crate::models::ItemQuery;
use crate::providers::{ProviderError, ProviderPayload, RateLimiter, ValuationProvider};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.ebay.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200);
const USER_AGENT: &str = concat!("curio-mv/", env!("CARGO_PKG_VERSION"));

/// Listings fetched per estimate; enough for a stable median without
/// paginating
const SEARCH_LIMIT: u32 = 25;

/// eBay sold-listing estimate client
pub struct EbayClient {
    http_client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl EbayClient {
    pub fn new(oauth_token: &str) -> Result<Self, ProviderError> {
        Self::with_base_url(oauth_token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(oauth_token: &str, base_url: &str) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {}", oauth_token))
            .map_err(|e| ProviderError::Transport(format!("invalid OAuth token: {}", e)))?;
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

    /// Median of the observed listing prices
    ///
    /// The median rather than the mean keeps one mispriced listing from
    /// skewing the estimate.
    fn estimate_from_prices(mut prices: Vec<f64>) -> Option<f64> {
        prices.retain(|p| p.is_finite() && *p > 0.0);
        if prices.is_empty() {
            return None;
        }
        prices.sort_by(|a, b| a.partial_cmp(b).expect("finite prices"));
        let mid = prices.len() / 2;
        if prices.len() % 2 == 1 {
            Some(prices[mid])
        } else {
            Some((prices[mid - 1] + prices[mid]) / 2.0)
        }
    }

    fn search_term(query: &ItemQuery) -> String {
        let mut term = query.title.clone();
        if let Some(issue) = &query.issue_number {
            term.push_str(&format!(" #{}", issue));
        }
        if let Some(grade) = &query.target_grade {
            term.push(' ');
            term.push_str(grade);
        }
        term
    }
}

#[async_trait]
impl ValuationProvider for EbayClient {
    fn name(&self) -> &'static str {
        "eBay"
    }

    async fn query_item(&self, query: &ItemQuery) -> Result<ProviderPayload, ProviderError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/buy/browse/v1/item_summary/search", self.base_url);
        let term = Self::search_term(query);
        let limit = SEARCH_LIMIT.to_string();

        tracing::debug!(q = %term, "searching eBay sold listings");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", term.as_str()),
                ("limit", limit.as_str()),
                ("filter", "soldItemsOnly:true"),
            ])
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

        let search: EbaySearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let prices: Vec<f64> = search
            .item_summaries
            .iter()
            .filter_map(|item| item.price.as_ref())
            .filter_map(|price| price.value.parse::<f64>().ok())
            .collect();

        let estimate = Self::estimate_from_prices(prices).ok_or(ProviderError::NoResults)?;

        Ok(ProviderPayload {
            values_by_grade: Default::default(),
            single_estimate: Some(estimate),
            is_notable: None,
            notable_reason: None,
            metadata: None,
        })
    }
}

// ============================================================================
// eBay Browse API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct EbaySearchResponse {
    #[serde(rename = "itemSummaries")]
    #[serde(default)]
    item_summaries: Vec<EbayItemSummary>,
}

#[derive(Debug, Deserialize)]
struct EbayItemSummary {
    #[allow(dead_code)]
    title: Option<String>,
    price: Option<EbayPrice>,
}

#[derive(Debug, Deserialize)]
struct EbayPrice {
    /// Decimal amount as a string, e.g. "12.50"
    value: String,
    #[allow(dead_code)]
    currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_median_odd() {
        let estimate = EbayClient::estimate_from_prices(vec![10.0, 30.0, 20.0]);
        assert_eq!(estimate, Some(20.0));
    }

    #[test]
    fn test_estimate_median_even() {
        let estimate = EbayClient::estimate_from_prices(vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(estimate, Some(25.0));
    }

    #[test]
    fn test_estimate_drops_unusable_prices() {
        let estimate = EbayClient::estimate_from_prices(vec![0.0, -5.0, f64::NAN, 42.0]);
        assert_eq!(estimate, Some(42.0));
    }

    #[test]
    fn test_estimate_empty_is_none() {
        assert_eq!(EbayClient::estimate_from_prices(vec![]), None);
        assert_eq!(EbayClient::estimate_from_prices(vec![0.0]), None);
    }

    #[test]
    fn test_parse_search_response() {
        let search: EbaySearchResponse = serde_json::from_str(
            r#"{
                "itemSummaries": [
                    {"title": "Saga #1 NM", "price": {"value": "85.00", "currency": "USD"}},
                    {"title": "Saga #1", "price": {"value": "91.50", "currency": "USD"}}
                ]
            }"#,
        )
        .expect("parse");
        assert_eq!(search.item_summaries.len(), 2);
        assert_eq!(search.item_summaries[0].price.as_ref().unwrap().value, "85.00");
    }
}
