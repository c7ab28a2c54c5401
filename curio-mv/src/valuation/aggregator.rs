//! Statistical aggregation of grade buckets
//!
//! Derives the per-grade verdicts (median, range, confidence, discrepancy)
//! and the top-level recommendation from the buckets the collector built.
//!
//! The scoring thresholds below are tunable product constants, preserved
//! exactly for behavioral compatibility with the established valuation
//! behavior; they are not derived from anything.

use crate::models::{
    valuation::GRADE_KEY_CURRENT, AggregatedValuation, ConfidenceLevel, ConfidenceScore,
    Discrepancy, DiscrepancySeverity, GradeBuckets, GradeValuation, ItemQuery, KeyIssueInfo,
    SourceValue, ValueRange,
};
use crate::providers::ProviderResult;
use crate::valuation::collector::collect_grade_buckets;
use chrono::Utc;
use std::collections::BTreeMap;

/// Weight of the source-count term (reaches maximum at 4 sources)
const SOURCE_WEIGHT: f64 = 30.0;
/// Source count at which the source-count term saturates
const FULL_SOURCE_COUNT: f64 = 4.0;
/// Weight of the value-agreement (coefficient of variation) term
const VARIANCE_WEIGHT: f64 = 40.0;
/// Weight of the outlier-ratio term
const OUTLIER_WEIGHT: f64 = 30.0;
/// A value deviating from the median by more than this ratio is an outlier
const OUTLIER_DEVIATION_RATIO: f64 = 0.30;
/// Score floor for buckets with fewer than two values
const INSUFFICIENT_DATA_SCORE: u8 = 25;
/// Minimum score for high confidence
const HIGH_SCORE_CUTOFF: u8 = 70;
/// High confidence additionally requires this many contributing sources
const HIGH_MIN_SOURCES: usize = 3;
/// Minimum score for medium confidence
const MEDIUM_SCORE_CUTOFF: u8 = 40;
/// Deviation ratio that flags a high-severity discrepancy
const DISCREPANCY_HIGH_RATIO: f64 = 0.50;
/// Deviation ratio that flags a medium-severity discrepancy
const DISCREPANCY_MEDIUM_RATIO: f64 = 0.30;

/// Median of a value slice: middle element, or the mean of the two middle
/// elements on even counts
pub fn median(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("bucket values are finite"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Reference value the discrepancy scan measures deviations against
///
/// The established behavior measures against the lower-middle element on
/// even counts instead of averaging, and changing it would shift which
/// buckets get flagged, so it is preserved as observed.
fn discrepancy_reference(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("bucket values are finite"));
    sorted[(sorted.len() - 1) / 2]
}

/// Population standard deviation
fn std_dev(values: &[f64], mean: f64) -> f64 {
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Confidence score for one bucket's value list
///
/// Three additive terms: source count (saturating at 4 sources), value
/// agreement via the coefficient of variation, and the share of non-outlier
/// values. Fewer than two values cannot be cross-checked at all and get the
/// fixed insufficient-data floor instead of the formula.
pub fn confidence_for(values: &[f64]) -> ConfidenceScore {
    let count = values.len();
    if count < 2 {
        return ConfidenceScore {
            level: ConfidenceLevel::Low,
            score: INSUFFICIENT_DATA_SCORE,
        };
    }

    let source_score = (count as f64 / FULL_SOURCE_COUNT).min(1.0) * SOURCE_WEIGHT;

    let mean = values.iter().sum::<f64>() / count as f64;
    let cv = std_dev(values, mean) / mean;
    let variance_score = (1.0 - cv).max(0.0) * VARIANCE_WEIGHT;

    let mid = median(values);
    let outliers = values
        .iter()
        .filter(|v| (**v - mid).abs() > OUTLIER_DEVIATION_RATIO * mid)
        .count();
    let outlier_score = (1.0 - outliers as f64 / count as f64) * OUTLIER_WEIGHT;

    let score = (source_score + variance_score + outlier_score).round().clamp(0.0, 100.0) as u8;

    let level = if score >= HIGH_SCORE_CUTOFF && count >= HIGH_MIN_SOURCES {
        ConfidenceLevel::High
    } else if score >= MEDIUM_SCORE_CUTOFF {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };

    ConfidenceScore { level, score }
}

/// Scan one bucket for a provider disagreement
///
/// Walks the sources in collection order and stops at the first one whose
/// deviation crosses the high threshold; at most one record per bucket.
/// When no source crosses the high threshold, the first one past the
/// medium threshold yields a medium record instead. Single-source buckets
/// cannot disagree with themselves and are never flagged.
pub fn detect_discrepancy(grade_key: &str, sources: &[SourceValue]) -> Option<Discrepancy> {
    if sources.len() < 2 {
        return None;
    }

    let values: Vec<f64> = sources.iter().map(|s| s.value).collect();
    let reference = discrepancy_reference(&values);

    let deviation_of = |value: f64| (value - reference).abs() / reference;

    let high = sources.iter().find(|s| deviation_of(s.value) > DISCREPANCY_HIGH_RATIO);
    let (flagged, severity) = match high {
        Some(source) => (source, DiscrepancySeverity::High),
        None => {
            let medium = sources
                .iter()
                .find(|s| deviation_of(s.value) > DISCREPANCY_MEDIUM_RATIO)?;
            (medium, DiscrepancySeverity::Medium)
        }
    };

    let deviation_pct = (deviation_of(flagged.value) * 100.0).round();
    Some(Discrepancy {
        grade_key: grade_key.to_string(),
        severity,
        sources: sources.to_vec(),
        message: format!(
            "{} reports {:.2} for grade {}, {:.0}% away from the consensus {:.2}",
            flagged.source, flagged.value, grade_key, deviation_pct, reference
        ),
    })
}

/// Per-grade verdict for one bucket
fn grade_valuation(sources: &[SourceValue]) -> GradeValuation {
    let values: Vec<f64> = sources.iter().map(|s| s.value).collect();
    let low = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let high = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    GradeValuation {
        recommended: median(&values),
        range: ValueRange { low, high },
        sources: sources.to_vec(),
    }
}

/// Pick the grade key the top-level recommendation is drawn from
///
/// Fallback order, explicitly: the caller's target grade key first, then
/// the "current" catch-all, then the first populated bucket in the map's
/// (lexicographic) iteration order. The order is part of the contract
/// because it decides the answer whenever the exact grade is missing.
fn select_grade_key(buckets: &GradeBuckets, target_key: &str) -> Option<String> {
    if buckets.contains_key(target_key) {
        return Some(target_key.to_string());
    }
    if buckets.contains_key(GRADE_KEY_CURRENT) {
        return Some(GRADE_KEY_CURRENT.to_string());
    }
    buckets.keys().next().cloned()
}

/// Merge descriptive metadata and notability out of the completed results
///
/// The first metadata payload in result order wins; any notability flag
/// promotes the key-issue info, with the first stated reason kept.
fn merge_metadata(results: &[ProviderResult]) -> (Option<crate::models::ItemMetadata>, KeyIssueInfo) {
    let metadata = results
        .iter()
        .filter(|r| r.success)
        .find_map(|r| r.metadata.clone());

    let is_key = results
        .iter()
        .filter(|r| r.success)
        .any(|r| r.is_notable == Some(true));
    let reason = results
        .iter()
        .filter(|r| r.success && r.is_notable == Some(true))
        .find_map(|r| r.notable_reason.clone());

    (metadata, KeyIssueInfo { is_key, reason })
}

/// Aggregate completed provider results into the final valuation
///
/// Zero usable values is a normal, representable outcome: the returned
/// valuation carries `success = false`, a zero placeholder value, and a
/// zero-score low confidence. It is never an error.
pub fn aggregate(query: &ItemQuery, results: &[ProviderResult]) -> AggregatedValuation {
    let buckets = collect_grade_buckets(results);
    let (metadata, key_issue) = merge_metadata(results);

    let mut fmv_by_grade = BTreeMap::new();
    let mut discrepancies = Vec::new();
    for (grade_key, sources) in &buckets {
        fmv_by_grade.insert(grade_key.clone(), grade_valuation(sources));
        if let Some(discrepancy) = detect_discrepancy(grade_key, sources) {
            discrepancies.push(discrepancy);
        }
    }

    let target_key = query.target_grade_key();
    let selected = select_grade_key(&buckets, &target_key);

    match selected {
        Some(grade_key) => {
            let verdict = fmv_by_grade[&grade_key].clone();
            let values: Vec<f64> = verdict.sources.iter().map(|s| s.value).collect();

            tracing::debug!(
                target_grade = %target_key,
                selected_grade = %grade_key,
                sources = values.len(),
                "aggregation selected grade bucket"
            );

            AggregatedValuation {
                success: true,
                recommended_value: verdict.recommended,
                value_range: verdict.range,
                confidence: confidence_for(&values),
                recommended_grade_key: Some(grade_key),
                fmv_by_grade,
                discrepancies,
                metadata,
                key_issue,
                verified_at: Utc::now(),
            }
        }
        None => {
            tracing::info!(
                title = %query.title,
                providers = results.len(),
                "aggregation exhausted: no usable provider values"
            );

            AggregatedValuation {
                success: false,
                recommended_value: 0.0,
                value_range: ValueRange { low: 0.0, high: 0.0 },
                confidence: ConfidenceScore::exhausted(),
                recommended_grade_key: None,
                fmv_by_grade,
                discrepancies,
                metadata,
                key_issue,
                verified_at: Utc::now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeStatus;
    use std::collections::HashMap;

    fn query_raw(title: &str) -> ItemQuery {
        ItemQuery {
            title: title.to_string(),
            issue_number: None,
            publisher: None,
            target_grade: None,
            grade_status: GradeStatus::Raw,
            cert_number: None,
        }
    }

    fn query_slabbed(title: &str, grade: &str) -> ItemQuery {
        ItemQuery {
            target_grade: Some(grade.to_string()),
            grade_status: GradeStatus::Slabbed,
            ..query_raw(title)
        }
    }

    fn success_result(source: &str, grades: &[(&str, f64)], estimate: Option<f64>) -> ProviderResult {
        let mut values_by_grade = HashMap::new();
        for (label, value) in grades {
            values_by_grade.insert(label.to_string(), *value);
        }
        ProviderResult {
            source: source.to_string(),
            success: true,
            values_by_grade,
            single_estimate: estimate,
            is_notable: None,
            notable_reason: None,
            metadata: None,
            latency_ms: 5,
            http_status: None,
            error_code: None,
            error_message: None,
        }
    }

    fn sources(pairs: &[(&str, f64)]) -> Vec<SourceValue> {
        pairs
            .iter()
            .map(|(source, value)| SourceValue {
                source: source.to_string(),
                value: *value,
            })
            .collect()
    }

    #[test]
    fn test_median_odd_length() {
        assert_eq!(median(&[10.0, 20.0, 30.0]), 20.0);
        assert_eq!(median(&[30.0, 10.0, 20.0]), 20.0);
    }

    #[test]
    fn test_median_even_length() {
        assert_eq!(median(&[10.0, 20.0, 30.0, 40.0]), 25.0);
        assert_eq!(median(&[20.0, 10.0]), 15.0);
    }

    #[test]
    fn test_single_value_bucket_is_low_25() {
        let score = confidence_for(&[100.0]);
        assert_eq!(score.level, ConfidenceLevel::Low);
        assert_eq!(score.score, INSUFFICIENT_DATA_SCORE);

        // Magnitude must not matter.
        let score = confidence_for(&[1_000_000.0]);
        assert_eq!(score.score, INSUFFICIENT_DATA_SCORE);
    }

    #[test]
    fn test_perfect_agreement_scores_high_with_enough_sources() {
        // Four identical values: full source score, zero CV, no outliers.
        let score = confidence_for(&[100.0, 100.0, 100.0, 100.0]);
        assert_eq!(score.score, 100);
        assert_eq!(score.level, ConfidenceLevel::High);
    }

    #[test]
    fn test_two_sources_cannot_be_high() {
        // Perfect agreement but only two contributors.
        let score = confidence_for(&[100.0, 100.0]);
        assert!(score.score >= HIGH_SCORE_CUTOFF);
        assert_eq!(score.level, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_high_requires_score_and_sources() {
        // Three agreeing sources clear both gates.
        let score = confidence_for(&[100.0, 102.0, 98.0]);
        assert!(score.score >= HIGH_SCORE_CUTOFF);
        assert_eq!(score.level, ConfidenceLevel::High);
    }

    #[test]
    fn test_wild_disagreement_scores_low() {
        let score = confidence_for(&[10.0, 500.0]);
        assert_eq!(score.level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_discrepancy_high_severity() {
        let bucket = sources(&[("A", 100.0), ("B", 160.0)]);
        let discrepancy = detect_discrepancy("9.8", &bucket).expect("flagged");
        assert_eq!(discrepancy.severity, DiscrepancySeverity::High);
        assert_eq!(discrepancy.sources.len(), 2, "record lists every source in the bucket");
    }

    #[test]
    fn test_discrepancy_below_threshold_is_none() {
        let bucket = sources(&[("A", 100.0), ("B", 125.0)]);
        assert!(detect_discrepancy("9.8", &bucket).is_none());
    }

    #[test]
    fn test_discrepancy_medium_severity() {
        let bucket = sources(&[("A", 100.0), ("B", 140.0)]);
        let discrepancy = detect_discrepancy("9.8", &bucket).expect("flagged");
        assert_eq!(discrepancy.severity, DiscrepancySeverity::Medium);
    }

    #[test]
    fn test_discrepancy_needs_two_sources() {
        let bucket = sources(&[("A", 100.0)]);
        assert!(detect_discrepancy("9.8", &bucket).is_none());
    }

    #[test]
    fn test_one_discrepancy_per_bucket() {
        // Two sources both far out; only one record comes back.
        let bucket = sources(&[("A", 100.0), ("B", 400.0), ("C", 500.0)]);
        let discrepancy = detect_discrepancy("raw", &bucket).expect("flagged");
        assert_eq!(discrepancy.severity, DiscrepancySeverity::High);
        assert_eq!(discrepancy.sources.len(), 3);
    }

    #[test]
    fn test_aggregate_selects_target_grade() {
        let query = query_slabbed("Saga", "9.8");
        let results = vec![
            success_result("GoCollect", &[("9.8", 1200.0), ("9.6", 640.0)], None),
            success_result("PriceCharting", &[("9.8", 1100.0)], None),
        ];

        let valuation = aggregate(&query, &results);
        assert!(valuation.success);
        assert_eq!(valuation.recommended_grade_key.as_deref(), Some("9.8"));
        assert_eq!(valuation.recommended_value, 1150.0);
        assert_eq!(valuation.value_range.low, 1100.0);
        assert_eq!(valuation.value_range.high, 1200.0);
    }

    #[test]
    fn test_aggregate_falls_back_to_current() {
        let query = query_slabbed("Saga", "9.8");
        let results = vec![success_result("eBay", &[], Some(91.5))];

        let valuation = aggregate(&query, &results);
        assert!(valuation.success);
        assert_eq!(valuation.recommended_grade_key.as_deref(), Some("current"));
        assert_eq!(valuation.recommended_value, 91.5);
        // Single contributor: insufficient-data floor.
        assert_eq!(valuation.confidence.score, INSUFFICIENT_DATA_SCORE);
        assert_eq!(valuation.confidence.level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_aggregate_falls_back_to_first_bucket() {
        let query = query_slabbed("Saga", "9.8");
        let results = vec![success_result("GoCollect", &[("4.0", 55.0)], None)];

        let valuation = aggregate(&query, &results);
        assert!(valuation.success);
        assert_eq!(valuation.recommended_grade_key.as_deref(), Some("4.0"));
    }

    #[test]
    fn test_aggregate_exhaustion_is_not_an_error() {
        let query = query_raw("Saga");
        let mut failed = success_result("GoCollect", &[], None);
        failed.success = false;

        let valuation = aggregate(&query, &[failed]);
        assert!(!valuation.success);
        assert_eq!(valuation.recommended_value, 0.0);
        assert_eq!(valuation.confidence.level, ConfidenceLevel::Low);
        assert_eq!(valuation.confidence.score, 0);
        assert!(valuation.fmv_by_grade.is_empty());
    }

    #[test]
    fn test_aggregate_merges_metadata_and_key_issue() {
        let query = query_raw("Saga");
        let mut with_metadata = success_result("CoverMatch", &[], None);
        with_metadata.metadata = Some(crate::models::ItemMetadata {
            publisher: Some("Image Comics".to_string()),
            writer: Some("Brian K. Vaughan".to_string()),
            ..Default::default()
        });
        let mut notable = success_result("GoCollect", &[("raw", 85.0)], None);
        notable.is_notable = Some(true);
        notable.notable_reason = Some("First issue of the series".to_string());

        let valuation = aggregate(&query, &[with_metadata, notable]);
        assert!(valuation.success);
        let metadata = valuation.metadata.expect("metadata");
        assert_eq!(metadata.publisher.as_deref(), Some("Image Comics"));
        assert!(valuation.key_issue.is_key);
        assert_eq!(
            valuation.key_issue.reason.as_deref(),
            Some("First issue of the series")
        );
    }

    #[test]
    fn test_aggregate_raw_query_uses_raw_bucket() {
        let query = query_raw("Saga");
        let results = vec![
            success_result("GoCollect", &[("raw", 85.0), ("9.8", 1200.0)], None),
            success_result("PriceCharting", &[("raw", 92.0)], None),
        ];

        let valuation = aggregate(&query, &results);
        assert_eq!(valuation.recommended_grade_key.as_deref(), Some("raw"));
        assert_eq!(valuation.recommended_value, 88.5);
        assert_eq!(valuation.fmv_by_grade.len(), 2);
    }
}
