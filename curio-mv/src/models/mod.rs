//! Data models for the market valuation service

pub mod enrichment_session;
pub mod query;
pub mod valuation;

pub use enrichment_session::{
    EnrichmentItemError, EnrichmentProgress, EnrichmentSession, EnrichmentState,
};
pub use query::{GradeStatus, ItemQuery};
pub use valuation::{
    AggregatedValuation, ConfidenceLevel, ConfidenceScore, Discrepancy, DiscrepancySeverity,
    GradeBuckets, GradeValuation, ItemMetadata, KeyIssueInfo, SourceValue, ValueRange,
};
