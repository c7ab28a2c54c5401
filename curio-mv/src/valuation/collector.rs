//! Grade-keyed value collection
//!
//! Folds successful provider results into [`GradeBuckets`]. Folding happens
//! strictly after the fan-out join point, so a single writer owns the map
//! and no locking is involved.

use crate::models::valuation::{normalize_grade_key, GRADE_KEY_CURRENT};
use crate::models::{GradeBuckets, SourceValue};
use crate::providers::ProviderResult;

/// Fold provider results into grade-keyed buckets
///
/// Only successful results contribute. Grade-ladder entries land under
/// their normalized grade key; a `single_estimate` lands under the
/// "current" catch-all, so one provider may contribute to several keys in
/// one pass. Values that are non-positive or non-finite are dropped
/// silently; they mean "no data", not zero. A bucket that would be empty is
/// simply absent from the map.
pub fn collect_grade_buckets(results: &[ProviderResult]) -> GradeBuckets {
    let mut buckets = GradeBuckets::new();

    for result in results.iter().filter(|r| r.success) {
        for (label, value) in &result.values_by_grade {
            if !usable(*value) {
                continue;
            }
            if let Some(key) = normalize_grade_key(label) {
                buckets.entry(key).or_default().push(SourceValue {
                    source: result.source.clone(),
                    value: *value,
                });
            }
        }

        if let Some(estimate) = result.single_estimate {
            if usable(estimate) {
                buckets
                    .entry(GRADE_KEY_CURRENT.to_string())
                    .or_default()
                    .push(SourceValue {
                        source: result.source.clone(),
                        value: estimate,
                    });
            }
        }
    }

    buckets
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
