//! Batch enrichment orchestrator
//!
//! Drives the valuation engine over a whole collection, one item at a
//! time, with a fixed inter-item delay that throttles the outbound request
//! rate toward the upstream providers. The delay is a deliberate
//! cooperative yield, not a retry backoff, and elapses even after a
//! successful item.
//!
//! One orchestrator owns the `Idle → Running → Idle` state machine; the
//! live session doubles as the run latch, so a second run cannot start
//! while one is in flight. Cancellation is honored only at item
//! boundaries and never interrupts the item in progress.

use crate::models::{EnrichmentSession, EnrichmentState};
use crate::services::engine::ValuationEngine;
use crate::store::{CollectionItem, CollectionStore, EnrichmentPatch};
use chrono::Utc;
use curio_common::events::{CurioEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a run could not start
#[derive(Debug, Error)]
pub enum StartError {
    #[error("an enrichment run is already in progress")]
    AlreadyRunning,

    #[error("failed to snapshot collection: {0}")]
    Store(#[from] curio_common::Error),
}

/// Single-worker batch enrichment driver
///
/// Cloning yields another handle to the same run state, so the background
/// worker and the API handlers observe one session.
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    engine: Arc<ValuationEngine>,
    store: Arc<dyn CollectionStore>,
    event_bus: EventBus,
    inter_item_delay: Duration,
    session: Arc<RwLock<Option<EnrichmentSession>>>,
    cancel_token: Arc<Mutex<Option<CancellationToken>>>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        engine: Arc<ValuationEngine>,
        store: Arc<dyn CollectionStore>,
        event_bus: EventBus,
        inter_item_delay: Duration,
    ) -> Self {
        Self {
            engine,
            store,
            event_bus,
            inter_item_delay,
            session: Arc::new(RwLock::new(None)),
            cancel_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a run over every item still needing enrichment
    ///
    /// Returns the fresh session snapshot, or refuses when a run is
    /// already in progress. The run itself proceeds on a background task;
    /// progress is observable through [`Self::session`] and the event bus.
    pub async fn start(&self, delay_override: Option<Duration>) -> Result<EnrichmentSession, StartError> {
        // Latch check and session creation under one write lock, so two
        // concurrent starts cannot both pass the check.
        let mut slot = self.session.write().await;
        if slot.as_ref().is_some_and(|s| s.is_running()) {
            return Err(StartError::AlreadyRunning);
        }

        let items: Vec<CollectionItem> = self
            .store
            .items()
            .await?
            .into_iter()
            .filter(|item| item.needs_enrichment())
            .collect();

        let session = EnrichmentSession::new(items.len());
        let session_id = session.session_id;
        *slot = Some(session.clone());
        drop(slot);

        let token = CancellationToken::new();
        *self.cancel_token.lock().await = Some(token.clone());

        tracing::info!(
            session_id = %session_id,
            items = items.len(),
            "starting enrichment run"
        );
        self.event_bus.emit_lossy(CurioEvent::EnrichmentSessionStarted {
            session_id,
            total: items.len(),
            timestamp: Utc::now(),
        });

        let worker = self.clone();
        let delay = delay_override.unwrap_or(self.inter_item_delay);
        tokio::spawn(async move {
            worker.run(session_id, items, delay, token).await;
        });

        Ok(session)
    }

    /// Request cancellation of the running session at the next item
    /// boundary; returns false when nothing is running
    pub async fn cancel(&self) -> bool {
        let running = self
            .session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.is_running());
        if !running {
            return false;
        }
        if let Some(token) = self.cancel_token.lock().await.as_ref() {
            token.cancel();
            return true;
        }
        false
    }

    /// Snapshot of the most recent session, if any
    pub async fn session(&self) -> Option<EnrichmentSession> {
        self.session.read().await.clone()
    }

    /// The sequential worker loop
    async fn run(
        &self,
        session_id: Uuid,
        items: Vec<CollectionItem>,
        delay: Duration,
        cancel: CancellationToken,
    ) {
        let total = items.len();

        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    session_id = %session_id,
                    completed = index,
                    "enrichment run cancelled at item boundary"
                );
                self.finish(session_id, EnrichmentState::Cancelled).await;
                return;
            }

            let enriched = match self.enrich_item(item).await {
                Ok(enriched) => enriched,
                Err(e) => {
                    // One item's failure is a no-op for that item, never
                    // the end of the run.
                    tracing::warn!(
                        session_id = %session_id,
                        item_id = %item.id,
                        title = %item.title,
                        error = %e,
                        "item enrichment failed, continuing"
                    );
                    self.event_bus.emit_lossy(CurioEvent::EnrichmentItemFailed {
                        session_id,
                        item_id: item.id,
                        message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    let mut slot = self.session.write().await;
                    if let Some(session) = slot.as_mut() {
                        session.record_error(item.id, e.to_string());
                    }
                    false
                }
            };

            let completed = {
                let mut slot = self.session.write().await;
                let session = slot.as_mut().expect("session exists while running");
                session.record_completed(enriched);
                session.progress.completed
            };

            self.event_bus.emit_lossy(CurioEvent::EnrichmentProgress {
                session_id,
                completed,
                total,
                current_item: Some(item.title.clone()),
                timestamp: Utc::now(),
            });

            // Throttle before the next item; the last item needs no pause.
            if index + 1 < total {
                tokio::time::sleep(delay).await;
            }
        }

        self.finish(session_id, EnrichmentState::Completed).await;
    }

    /// Enrich one item; returns whether any field was filled in
    async fn enrich_item(&self, item: &CollectionItem) -> curio_common::Result<bool> {
        let query = item.to_query();
        let needs_metadata = item.cover_image_url.is_none() || item.writer.is_none();

        let mut patch = EnrichmentPatch::default();

        if needs_metadata {
            // Full aggregation reaches the metadata providers too, and its
            // recommendation fills the value gap in the same pass.
            let valuation = self.engine.aggregate_valuation(&query, None).await;

            if let Some(metadata) = valuation.metadata {
                if item.cover_image_url.is_none() {
                    patch.cover_image_url = metadata.cover_image_url;
                }
                if item.writer.is_none() {
                    patch.writer = metadata.writer;
                    patch.artist = metadata.artist;
                }
            }
            if item.current_value.is_none() && valuation.success {
                patch.current_value = Some(valuation.recommended_value);
                patch.value_verified_at = Some(valuation.verified_at);
            }
        } else if item.current_value.is_none() {
            // Value is the only gap: the quick path answers with a single
            // provider round-trip. "Unavailable" stays a gap, never a zero.
            if let Some(resolved) = self.engine.quick_value(&query, None).await {
                patch.current_value = Some(resolved.value);
                patch.value_verified_at = Some(Utc::now());
            }
        }

        if patch.is_empty() {
            return Ok(false);
        }

        self.store.apply_patch(item.id, patch).await?;
        Ok(true)
    }

    /// Move the session to a terminal state and announce it
    async fn finish(&self, session_id: Uuid, state: EnrichmentState) {
        let snapshot = {
            let mut slot = self.session.write().await;
            let session = slot.as_mut().expect("session exists while running");
            session.transition_to(state);
            session.clone()
        };

        *self.cancel_token.lock().await = None;

        tracing::info!(
            session_id = %session_id,
            state = ?snapshot.state,
            completed = snapshot.progress.completed,
            enriched = snapshot.enriched,
            duration_seconds = snapshot.duration_seconds(),
            "enrichment run finished"
        );

        self.event_bus.emit_lossy(CurioEvent::EnrichmentSessionCompleted {
            session_id,
            enriched: snapshot.enriched,
            total: snapshot.progress.total,
            cancelled: snapshot.state == EnrichmentState::Cancelled,
            duration_seconds: snapshot.duration_seconds(),
            timestamp: Utc::now(),
        });
    }
}
