//! curio-mv - Market Valuation Service
//!
//! **Module Identity:**
//! - Name: curio-mv (Market Valuation)
//! - Default port: 5731
//!
//! Enriches the Curio collectible inventory with market values and
//! metadata aggregated from several independent external providers, and
//! exposes the valuation and batch-enrichment API over HTTP + SSE.

use anyhow::Result;
use curio_common::events::EventBus;
use curio_mv::providers::{
    CoverMatchClient, EbayClient, GoCollectClient, PriceChartingClient, ValuationProvider,
};
use curio_mv::services::{EnrichmentOrchestrator, ValuationEngine};
use curio_mv::store::MemoryStore;
use curio_mv::{AppState, MvConfig};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting curio-mv (Market Valuation) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = MvConfig::load()?;

    // Register every provider whose credentials are configured; a missing
    // credential disables that provider, it does not stop the service.
    let providers = build_providers(&config);
    if providers.is_empty() {
        warn!("no providers configured; valuations will come back empty");
    } else {
        info!(
            providers = ?providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "provider registry ready"
        );
    }

    let engine = Arc::new(ValuationEngine::new(
        providers,
        config.fanout_deadline(),
        config.provider_timeout(),
    ));

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    // The storage collaborator; the in-process store holds the current
    // session's collection snapshot.
    let store = Arc::new(MemoryStore::new());

    let orchestrator = Arc::new(EnrichmentOrchestrator::new(
        engine.clone(),
        store.clone(),
        event_bus.clone(),
        config.enrichment_delay(),
    ));

    let bind_address = config.bind_address.clone();
    let state = AppState::new(engine, orchestrator, store, event_bus);
    let app = curio_mv::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the provider registry from configuration
fn build_providers(config: &MvConfig) -> Vec<Arc<dyn ValuationProvider>> {
    let mut providers: Vec<Arc<dyn ValuationProvider>> = Vec::new();

    match &config.gocollect.api_key {
        Some(key) => {
            let client = match &config.gocollect.base_url {
                Some(base) => GoCollectClient::with_base_url(key, base),
                None => GoCollectClient::new(key),
            };
            match client {
                Ok(client) => providers.push(Arc::new(client)),
                Err(e) => warn!(error = %e, "failed to initialize GoCollect client"),
            }
        }
        None => warn!("GoCollect API key not configured, provider disabled"),
    }

    match &config.pricecharting.api_key {
        Some(key) => {
            let client = match &config.pricecharting.base_url {
                Some(base) => PriceChartingClient::with_base_url(key, base),
                None => PriceChartingClient::new(key),
            };
            match client {
                Ok(client) => providers.push(Arc::new(client)),
                Err(e) => warn!(error = %e, "failed to initialize PriceCharting client"),
            }
        }
        None => warn!("PriceCharting API token not configured, provider disabled"),
    }

    match &config.ebay.api_key {
        Some(token) => {
            let client = match &config.ebay.base_url {
                Some(base) => EbayClient::with_base_url(token, base),
                None => EbayClient::new(token),
            };
            match client {
                Ok(client) => providers.push(Arc::new(client)),
                Err(e) => warn!(error = %e, "failed to initialize eBay client"),
            }
        }
        None => warn!("eBay OAuth token not configured, provider disabled"),
    }

    // The recognition collaborator needs no credential; it is expected to
    // run alongside this service.
    let covermatch = match &config.covermatch.base_url {
        Some(base) => CoverMatchClient::with_base_url(base),
        None => CoverMatchClient::new(),
    };
    match covermatch {
        Ok(client) => providers.push(Arc::new(client)),
        Err(e) => warn!(error = %e, "failed to initialize CoverMatch client"),
    }

    providers
}
