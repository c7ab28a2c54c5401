//! Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use curio_common::events::EventBus;
use curio_mv::models::{GradeStatus, ItemMetadata};
use curio_mv::providers::{ProviderError, ProviderPayload, ValuationProvider};
use curio_mv::services::{EnrichmentOrchestrator, ValuationEngine};
use curio_mv::store::{CollectionItem, MemoryStore};
use curio_mv::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Scriptable provider standing in for the external services
pub struct ScriptedProvider {
    name: &'static str,
    delay: Duration,
    payload: Option<ProviderPayload>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn succeeding(name: &'static str, payload: ProviderPayload) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
            payload: Some(payload),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
            payload: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ValuationProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn query_item(
        &self,
        _query: &curio_mv::models::ItemQuery,
    ) -> Result<ProviderPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => Err(ProviderError::Transport("scripted failure".to_string())),
        }
    }
}

/// Payload with one grade-ladder entry
pub fn grade_payload(grade: &str, value: f64) -> ProviderPayload {
    let mut values_by_grade = HashMap::new();
    values_by_grade.insert(grade.to_string(), value);
    ProviderPayload {
        values_by_grade,
        ..Default::default()
    }
}

/// Payload with a single marketplace estimate
pub fn estimate_payload(value: f64) -> ProviderPayload {
    ProviderPayload {
        single_estimate: Some(value),
        ..Default::default()
    }
}

/// Payload carrying only descriptive metadata
pub fn metadata_payload() -> ProviderPayload {
    ProviderPayload {
        metadata: Some(ItemMetadata {
            publisher: Some("Image Comics".to_string()),
            cover_image_url: Some("https://img.example/cover.jpg".to_string()),
            writer: Some("Brian K. Vaughan".to_string()),
            artist: Some("Fiona Staples".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// An inventory item with every enrichable field still missing
pub fn bare_item(title: &str) -> CollectionItem {
    CollectionItem {
        id: Uuid::new_v4(),
        title: title.to_string(),
        issue_number: Some("1".to_string()),
        publisher: None,
        grade: None,
        grade_status: GradeStatus::Raw,
        cert_number: None,
        cover_image_url: None,
        writer: None,
        artist: None,
        current_value: None,
        value_verified_at: None,
    }
}

/// Test fixture bundling the app state with handles the tests poke at
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub event_bus: EventBus,
}

/// Build an app state over scripted providers and a short enrichment delay
pub fn test_app(providers: Vec<Arc<dyn ValuationProvider>>) -> TestApp {
    test_app_with_delay(providers, Duration::from_millis(50))
}

pub fn test_app_with_delay(
    providers: Vec<Arc<dyn ValuationProvider>>,
    enrichment_delay: Duration,
) -> TestApp {
    let engine = Arc::new(ValuationEngine::new(
        providers,
        Duration::from_secs(5),
        Duration::from_secs(2),
    ));
    let event_bus = EventBus::new(100);
    let store = Arc::new(MemoryStore::new());
    let orchestrator = Arc::new(EnrichmentOrchestrator::new(
        engine.clone(),
        store.clone(),
        event_bus.clone(),
        enrichment_delay,
    ));

    let state = AppState::new(engine, orchestrator, store.clone(), event_bus.clone());
    TestApp {
        state,
        store,
        event_bus,
    }
}
