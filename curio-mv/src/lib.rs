//! curio-mv library interface
//!
//! Market valuation service for the Curio collectible inventory: fans out
//! to the external pricing and metadata providers, reconciles their
//! answers into one confidence-scored estimate, and drives rate-limited
//! batch enrichment over a whole collection.

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod services;
pub mod store;
pub mod valuation;

pub use crate::config::MvConfig;
pub use crate::error::{ApiError, ApiResult};

use crate::services::{EnrichmentOrchestrator, ValuationEngine};
use crate::store::CollectionStore;
use axum::Router;
use chrono::{DateTime, Utc};
use curio_common::events::EventBus;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Aggregation and quick-resolution engine
    pub engine: Arc<ValuationEngine>,
    /// Batch enrichment driver (also the run latch owner)
    pub orchestrator: Arc<EnrichmentOrchestrator>,
    /// Collection storage boundary
    pub store: Arc<dyn CollectionStore>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        engine: Arc<ValuationEngine>,
        orchestrator: Arc<EnrichmentOrchestrator>,
        store: Arc<dyn CollectionStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            engine,
            orchestrator,
            store,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::valuation_routes())
        .merge(api::enrichment_routes())
        .route("/events", get(api::event_stream))
        .route("/enrichment/events", get(api::enrichment_event_stream))
        .merge(api::health_routes())
        .with_state(state)
}
