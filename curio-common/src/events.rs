//! Event types and broadcast bus for the Curio event system
//!
//! Services publish domain events on an [`EventBus`] (a thin wrapper around
//! `tokio::sync::broadcast`) and API layers bridge subscribed events to SSE
//! clients. Subscribers only receive events emitted after they subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Curio event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CurioEvent {
    /// A batch enrichment run started
    EnrichmentSessionStarted {
        session_id: Uuid,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Per-item progress update, emitted after every processed item
    EnrichmentProgress {
        session_id: Uuid,
        completed: usize,
        total: usize,
        current_item: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A single item failed to enrich; the run continues
    EnrichmentItemFailed {
        session_id: Uuid,
        item_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The enrichment run reached a terminal state
    EnrichmentSessionCompleted {
        session_id: Uuid,
        enriched: usize,
        total: usize,
        cancelled: bool,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },
}

impl CurioEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CurioEvent::EnrichmentSessionStarted { .. } => "EnrichmentSessionStarted",
            CurioEvent::EnrichmentProgress { .. } => "EnrichmentProgress",
            CurioEvent::EnrichmentItemFailed { .. } => "EnrichmentItemFailed",
            CurioEvent::EnrichmentSessionCompleted { .. } => "EnrichmentSessionCompleted",
        }
    }
}

/// Broadcast event bus shared between services and their API layers
///
/// Cloning an `EventBus` clones a handle to the same channel. Lagged
/// subscribers lose the oldest buffered events rather than blocking
/// publishers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CurioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CurioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CurioEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<CurioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    ///
    /// Progress events are advisory; it is fine if no client is connected.
    pub fn emit_lossy(&self, event: CurioEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event emitted with no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
