//! Tiered sequential resolver
//!
//! The latency-optimized alternative to full aggregation: query providers
//! one at a time in priority order and stop at the first usable answer.
//! Used when the caller needs one number quickly (auto-filling a value at
//! item creation) and no confidence report.
//!
//! Every call site that needs first-success-wins behavior goes through this
//! one component; callers pass only the provider priority list and the
//! grade context carried by the query.

use crate::models::{valuation::GRADE_KEY_CURRENT, ItemQuery};
use crate::providers::{execute_provider_call, ProviderResult, ValuationProvider};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Value resolved by the first responsive tier
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedValue {
    pub value: f64,
    pub source: String,
}

/// First-success-wins resolver over an ordered provider list
pub struct TieredResolver {
    per_call_timeout: Duration,
}

impl TieredResolver {
    pub fn new(per_call_timeout: Duration) -> Self {
        Self { per_call_timeout }
    }

    /// Try each tier in order; stop at the first strictly positive value
    ///
    /// A failed or valueless tier advances to the next with no retry.
    /// Remaining tiers are never invoked once a value is found. Exhausting
    /// every tier yields `None` ("unavailable"), which callers must treat
    /// as no value, never as zero.
    pub async fn resolve(
        &self,
        query: &ItemQuery,
        tiers: &[Arc<dyn ValuationProvider>],
    ) -> Option<ResolvedValue> {
        let request_id = Uuid::new_v4();
        let target_key = query.target_grade_key();

        for provider in tiers {
            let result = execute_provider_call(
                provider.as_ref(),
                query,
                request_id,
                "tiered_resolve",
                self.per_call_timeout,
            )
            .await;

            if let Some(value) = usable_value(&result, &target_key) {
                tracing::debug!(
                    source = %result.source,
                    value,
                    "tiered resolver accepted value"
                );
                return Some(ResolvedValue {
                    value,
                    source: result.source,
                });
            }

            tracing::debug!(
                source = provider.name(),
                "tier had no usable value, advancing"
            );
        }

        tracing::info!(title = %query.title, "all tiers exhausted, value unavailable");
        None
    }
}

/// Extract the first usable (strictly positive) value from one result
///
/// Preference order within a single result: the caller's target grade
/// entry, the "current" catch-all, then the provider's single estimate.
fn usable_value(result: &ProviderResult, target_key: &str) -> Option<f64> {
    if !result.success {
        return None;
    }

    let candidates = [
        result.values_by_grade.get(target_key).copied(),
        result.values_by_grade.get(GRADE_KEY_CURRENT).copied(),
        result.single_estimate,
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeStatus;
    use crate::providers::mock::MockProvider;
    use crate::providers::ProviderPayload;

    fn query() -> ItemQuery {
        ItemQuery {
            title: "Saga".to_string(),
            issue_number: Some("1".to_string()),
            publisher: None,
            target_grade: None,
            grade_status: GradeStatus::Raw,
            cert_number: None,
        }
    }

    fn resolver() -> TieredResolver {
        TieredResolver::new(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_first_tier_failure_advances_and_later_tiers_skipped() {
        let tier1 = Arc::new(MockProvider::failing("GoCollect", "service unavailable"));
        let tier2 = Arc::new(MockProvider::succeeding(
            "eBay",
            ProviderPayload {
                single_estimate: Some(120.0),
                ..Default::default()
            },
        ));
        let tier3 = Arc::new(MockProvider::succeeding(
            "PriceCharting",
            MockProvider::grade_payload("raw", 90.0),
        ));
        let tier3_calls = tier3.calls.clone();

        let tiers: Vec<Arc<dyn ValuationProvider>> = vec![tier1, tier2, tier3];
        let resolved = resolver().resolve(&query(), &tiers).await.expect("value");

        assert_eq!(resolved.value, 120.0);
        assert_eq!(resolved.source, "eBay");
        assert_eq!(
            tier3_calls.load(std::sync::atomic::Ordering::SeqCst),
            0,
            "tier 3 must never be invoked once tier 2 answered"
        );
    }

    #[tokio::test]
    async fn test_zero_value_is_not_usable() {
        let tier1 = Arc::new(MockProvider::succeeding(
            "GoCollect",
            ProviderPayload {
                single_estimate: Some(0.0),
                ..Default::default()
            },
        ));
        let tier2 = Arc::new(MockProvider::succeeding(
            "eBay",
            ProviderPayload {
                single_estimate: Some(45.0),
                ..Default::default()
            },
        ));

        let tiers: Vec<Arc<dyn ValuationProvider>> = vec![tier1, tier2];
        let resolved = resolver().resolve(&query(), &tiers).await.expect("value");
        assert_eq!(resolved.source, "eBay");
    }

    #[tokio::test]
    async fn test_exhausted_tiers_yield_none() {
        let tier1 = Arc::new(MockProvider::failing("GoCollect", "timeout"));
        let tier2 = Arc::new(MockProvider::failing("eBay", "down"));

        let tiers: Vec<Arc<dyn ValuationProvider>> = vec![tier1, tier2];
        assert!(resolver().resolve(&query(), &tiers).await.is_none());
    }

    #[tokio::test]
    async fn test_target_grade_preferred_over_estimate() {
        let mut payload = MockProvider::grade_payload("9.8", 1200.0);
        payload.single_estimate = Some(90.0);
        let provider = Arc::new(MockProvider::succeeding("GoCollect", payload));

        let mut q = query();
        q.grade_status = GradeStatus::Slabbed;
        q.target_grade = Some("9.8".to_string());

        let tiers: Vec<Arc<dyn ValuationProvider>> = vec![provider];
        let resolved = resolver().resolve(&q, &tiers).await.expect("value");
        assert_eq!(resolved.value, 1200.0);
    }
}
