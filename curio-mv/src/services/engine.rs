//! Valuation engine
//!
//! The aggregation entry point gluing the fan-out executor, the
//! statistical aggregator, and the tiered resolver behind one interface.
//! Callers pick full aggregation (a confidence-scored report) or the quick
//! first-success-wins path; both work over the same provider registry.

use crate::models::{AggregatedValuation, ItemQuery};
use crate::providers::ValuationProvider;
use crate::services::fanout::FanOutExecutor;
use crate::valuation::{aggregate, ResolvedValue, TieredResolver};
use std::sync::Arc;
use std::time::Duration;

/// Default tier priority for quick resolution: primary market-value
/// service, then the marketplace estimate, then the secondary guide
const DEFAULT_TIER_ORDER: [&str; 3] = ["GoCollect", "eBay", "PriceCharting"];

/// Aggregation and quick-resolution façade over the provider registry
pub struct ValuationEngine {
    providers: Vec<Arc<dyn ValuationProvider>>,
    executor: FanOutExecutor,
    resolver: TieredResolver,
}

impl ValuationEngine {
    pub fn new(
        providers: Vec<Arc<dyn ValuationProvider>>,
        fanout_deadline: Duration,
        per_call_timeout: Duration,
    ) -> Self {
        let executor = FanOutExecutor::new(providers.clone(), fanout_deadline, per_call_timeout);
        let resolver = TieredResolver::new(per_call_timeout);
        Self {
            providers,
            executor,
            resolver,
        }
    }

    /// Names of every registered provider
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Full aggregation: fan out, collect, and score
    ///
    /// Never fails; aggregation exhaustion comes back as a
    /// `success = false` valuation.
    pub async fn aggregate_valuation(
        &self,
        query: &ItemQuery,
        include_sources: Option<&[String]>,
    ) -> AggregatedValuation {
        let results = self.executor.execute(query, include_sources).await;
        aggregate(query, &results)
    }

    /// Quick resolution: first usable value in tier priority order
    ///
    /// `tiers` overrides the default priority; unknown names are skipped.
    /// `None` means "unavailable" and must never be rendered as zero.
    pub async fn quick_value(
        &self,
        query: &ItemQuery,
        tiers: Option<&[String]>,
    ) -> Option<ResolvedValue> {
        let ordered = self.ordered_tiers(tiers);
        self.resolver.resolve(query, &ordered).await
    }

    /// Arrange registered providers into the requested tier order
    fn ordered_tiers(&self, tiers: Option<&[String]>) -> Vec<Arc<dyn ValuationProvider>> {
        let find = |name: &str| {
            self.providers
                .iter()
                .find(|p| p.name().eq_ignore_ascii_case(name))
                .cloned()
        };

        match tiers {
            Some(names) => names.iter().filter_map(|name| find(name)).collect(),
            None => DEFAULT_TIER_ORDER
                .iter()
                .filter_map(|name| find(name))
                .collect(),
        }
    }
}
