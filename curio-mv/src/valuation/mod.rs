//! Valuation engine internals
//!
//! Turns a set of normalized provider results into one trustworthy answer:
//! - `collector` folds results into grade-keyed value buckets
//! - `aggregator` derives medians, confidence, and discrepancy flags
//! - `resolver` is the fast first-success-wins alternative to full
//!   aggregation

pub mod aggregator;
pub mod collector;
pub mod resolver;

pub use aggregator::aggregate;
pub use collector::collect_grade_buckets;
pub use resolver::{ResolvedValue, TieredResolver};
