//! HTTP API handlers

pub mod enrichment;
pub mod health;
pub mod sse;
pub mod valuation;

pub use enrichment::enrichment_routes;
pub use health::health_routes;
pub use sse::{enrichment_event_stream, event_stream};
pub use valuation::valuation_routes;
