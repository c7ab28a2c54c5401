//! Valuation output types
//!
//! Everything the aggregation engine derives from a set of provider
//! results: grade buckets, confidence scoring, discrepancy records, and the
//! final [`AggregatedValuation`] payload. All of these are created fresh on
//! every aggregation call and never partially updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel grade key for ungraded (raw) books
pub const GRADE_KEY_RAW: &str = "raw";

/// Catch-all grade key used when a provider reports no grade breakdown
pub const GRADE_KEY_CURRENT: &str = "current";

/// One provider's value contribution to a grade bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceValue {
    pub source: String,
    pub value: f64,
}

/// Values collected per normalized grade key across all providers
///
/// `BTreeMap` keeps iteration deterministic, which matters because the
/// aggregator's last-resort fallback picks "the first available bucket" and
/// that choice must be reproducible.
pub type GradeBuckets = BTreeMap<String, Vec<SourceValue>>;

/// Normalize a provider-reported grade label into a bucket key
///
/// Numeric grades canonicalize to one decimal ("9.8", "10.0") so the same
/// grade reported as "9.80" or "9.8" lands in one bucket. The "raw" and
/// "current" sentinels pass through; anything else is lowercased verbatim.
/// Unusable labels (empty, non-positive numerics) yield `None`.
pub fn normalize_grade_key(label: &str) -> Option<String> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.eq_ignore_ascii_case(GRADE_KEY_RAW) {
        return Some(GRADE_KEY_RAW.to_string());
    }
    if trimmed.eq_ignore_ascii_case(GRADE_KEY_CURRENT) {
        return Some(GRADE_KEY_CURRENT.to_string());
    }
    if let Ok(grade) = trimmed.parse::<f64>() {
        if grade.is_finite() && grade > 0.0 {
            return Some(format!("{:.1}", grade));
        }
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}

/// Trust classification for an aggregated value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

/// Derived 0-100 trust measure for one grade bucket
///
/// Always recomputed from the bucket's value list at read time; the same
/// inputs always produce the same score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub level: ConfidenceLevel,
    pub score: u8,
}

impl ConfidenceScore {
    /// The floor returned when no usable provider data exists at all
    pub fn exhausted() -> Self {
        Self {
            level: ConfidenceLevel::Low,
            score: 0,
        }
    }
}

/// How severely providers disagree inside one grade bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscrepancySeverity {
    Low,
    Medium,
    High,
}

/// A flagged disagreement between providers for one grade bucket
///
/// At most one per bucket; always references at least two sources, since a
/// single source cannot disagree with itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub grade_key: String,
    pub severity: DiscrepancySeverity,
    pub sources: Vec<SourceValue>,
    pub message: String,
}

/// Inclusive low/high bounds of the values observed for a grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub low: f64,
    pub high: f64,
}

/// Per-grade verdict: recommended value, observed range, contributors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeValuation {
    pub recommended: f64,
    pub range: ValueRange,
    pub sources: Vec<SourceValue>,
}

/// Descriptive metadata returned by the recognition/metadata providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
}

impl ItemMetadata {
    /// Whether any field carries data
    pub fn is_empty(&self) -> bool {
        self.series.is_none()
            && self.publisher.is_none()
            && self.cover_image_url.is_none()
            && self.writer.is_none()
            && self.artist.is_none()
            && self.release_year.is_none()
    }
}

/// Key-issue notability, merged from whichever providers flag it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyIssueInfo {
    pub is_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The final output of one aggregation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedValuation {
    /// False when zero usable provider values existed; the zero
    /// `recommended_value` below is then a placeholder, not an estimate.
    pub success: bool,

    /// Median value for the selected grade bucket
    pub recommended_value: f64,

    /// Observed min/max for the selected grade bucket
    pub value_range: ValueRange,

    /// Trust in `recommended_value`
    pub confidence: ConfidenceScore,

    /// Grade key the recommendation was drawn from, when one existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_grade_key: Option<String>,

    /// Full per-grade breakdown across every populated bucket
    pub fmv_by_grade: BTreeMap<String, GradeValuation>,

    /// At most one disagreement record per grade bucket
    pub discrepancies: Vec<Discrepancy>,

    /// Descriptive metadata, when any provider supplied it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ItemMetadata>,

    /// Key-issue notability
    pub key_issue: KeyIssueInfo,

    /// When this valuation was computed
    pub verified_at: DateTime<Utc>,
}
