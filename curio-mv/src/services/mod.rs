//! Orchestration services

pub mod engine;
pub mod enrichment;
pub mod fanout;

pub use engine::ValuationEngine;
pub use enrichment::{EnrichmentOrchestrator, StartError};
pub use fanout::FanOutExecutor;
