//! Provider clients for external pricing and metadata services
//!
//! Each client wraps one external service and maps its duck-typed payload
//! into the one normalized [`ProviderResult`] shape at this boundary. No
//! component outside this module branches on provider identity.
//!
//! # Contract
//! A provider call never propagates an error to its caller: transport,
//! HTTP, parse, and timeout failures are all encoded as `success = false`
//! plus a typed error code. [`execute_provider_call`] is the uniform
//! wrapper enforcing that contract, the per-call timeout, and the one
//! audit record every call must emit.

pub mod covermatch_client;
pub mod ebay_client;
pub mod gocollect_client;
pub mod pricecharting_client;

pub use covermatch_client::CoverMatchClient;
pub use ebay_client::EbayClient;
pub use gocollect_client::GoCollectClient;
pub use pricecharting_client::PriceChartingClient;

use crate::audit::{truncate_error, AuditRecord, AuditStatus};
use crate::models::{ItemMetadata, ItemQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Typed failure of one provider call, before normalization
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx response from the service
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection, DNS, or TLS level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// 2xx response with no usable data for the query
    #[error("no results for query")]
    NoResults,
}

impl ProviderError {
    /// Wire-level error code carried in the normalized result
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::Http { .. } => "HTTP_ERROR",
            ProviderError::Transport(_) => "FETCH_ERROR",
            ProviderError::Parse(_) => "FETCH_ERROR",
            ProviderError::NoResults => "NO_RESULTS",
        }
    }

    /// HTTP status, when the failure carried one
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error code for a call abandoned by the per-call timeout
pub const TIMEOUT_ERROR_CODE: &str = "TIMEOUT";

/// Raw payload a provider client extracts from its service
///
/// Absent fields mean "no data", never zero.
#[derive(Debug, Clone, Default)]
pub struct ProviderPayload {
    /// Fair market values keyed by normalized grade label
    pub values_by_grade: HashMap<String, f64>,
    /// Single estimate from services without a grade breakdown
    pub single_estimate: Option<f64>,
    /// Key-issue notability flag
    pub is_notable: Option<bool>,
    pub notable_reason: Option<String>,
    /// Descriptive metadata (recognition/catalog services)
    pub metadata: Option<ItemMetadata>,
}

impl ProviderPayload {
    /// Whether the payload carries anything downstream components can use
    pub fn has_data(&self) -> bool {
        !self.values_by_grade.is_empty()
            || self.single_estimate.is_some()
            || self.is_notable.is_some()
            || self.metadata.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// Normalized outcome of exactly one provider call
///
/// Owned by the fan-out executor for the duration of one aggregation and
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub source: String,
    pub success: bool,
    pub values_by_grade: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_estimate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_notable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notable_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// One external pricing or metadata service
#[async_trait]
pub trait ValuationProvider: Send + Sync {
    /// Stable provider name, used for source attribution and selection
    fn name(&self) -> &'static str;

    /// Perform one outbound call and extract the raw payload
    ///
    /// Implementations report failures as [`ProviderError`]; the uniform
    /// wrapper turns them into data before anything downstream sees them.
    async fn query_item(&self, query: &ItemQuery) -> Result<ProviderPayload, ProviderError>;
}

/// Uniform call wrapper around one provider
///
/// Applies the per-call timeout, converts any failure into a
/// `success=false` result, and emits the audit record on every path. This
/// function never fails.
pub async fn execute_provider_call(
    provider: &dyn ValuationProvider,
    query: &ItemQuery,
    request_id: Uuid,
    function: &'static str,
    timeout: Duration,
) -> ProviderResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, provider.query_item(query)).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (result, status, outputs_summary) = match outcome {
        Ok(Ok(payload)) => {
            let status = if payload.has_data() {
                AuditStatus::Ok
            } else {
                AuditStatus::Partial
            };
            let outputs = format!(
                "grades={} estimate={} metadata={}",
                payload.values_by_grade.len(),
                payload.single_estimate.is_some(),
                payload.metadata.as_ref().is_some_and(|m| !m.is_empty()),
            );
            let result = ProviderResult {
                source: provider.name().to_string(),
                success: true,
                values_by_grade: payload.values_by_grade,
                single_estimate: payload.single_estimate,
                is_notable: payload.is_notable,
                notable_reason: payload.notable_reason,
                metadata: payload.metadata,
                latency_ms,
                http_status: None,
                error_code: None,
                error_message: None,
            };
            (result, status, outputs)
        }
        Ok(Err(error)) => {
            let message = truncate_error(&error.to_string());
            tracing::warn!(
                provider = provider.name(),
                error = %error,
                "provider call failed"
            );
            let result = ProviderResult {
                source: provider.name().to_string(),
                success: false,
                values_by_grade: HashMap::new(),
                single_estimate: None,
                is_notable: None,
                notable_reason: None,
                metadata: None,
                latency_ms,
                http_status: error.http_status(),
                error_code: Some(error.code().to_string()),
                error_message: Some(message.clone()),
            };
            (result, AuditStatus::Error, message)
        }
        Err(_elapsed) => {
            tracing::warn!(
                provider = provider.name(),
                timeout_ms = timeout.as_millis() as u64,
                "provider call timed out"
            );
            let message = format!("call exceeded {}ms", timeout.as_millis());
            let result = ProviderResult {
                source: provider.name().to_string(),
                success: false,
                values_by_grade: HashMap::new(),
                single_estimate: None,
                is_notable: None,
                notable_reason: None,
                metadata: None,
                latency_ms,
                http_status: None,
                error_code: Some(TIMEOUT_ERROR_CODE.to_string()),
                error_message: Some(message.clone()),
            };
            (result, AuditStatus::Error, message)
        }
    };

    AuditRecord {
        request_id,
        provider: provider.name(),
        function,
        status,
        latency_ms,
        http_status: result.http_status,
        error_code: result.error_code.clone(),
        error_message: result.error_message.clone(),
        inputs_summary: query.summary(),
        outputs_summary,
    }
    .emit();

    result
}

/// Minimum-interval rate limiter shared by the provider clients
///
/// Serializes callers on a mutex over the last-request instant and sleeps
/// whatever remains of the interval. Providers with different upstream
/// politeness rules pick different intervals.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    /// Wait until the minimum interval since the previous call has elapsed
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiting provider call");
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}

// ============================================================================
// Mock provider for unit tests
// ============================================================================
