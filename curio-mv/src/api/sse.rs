//! Server-Sent Events endpoints
//!
//! `/events` is a heartbeat-only connection-status stream; `/enrichment/events`
//! forwards the enrichment progress events so a UI can render a live bar.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use curio_common::events::CurioEvent;
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - heartbeat stream for connection status
pub async fn event_stream(
    State(_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    curio_common::sse::heartbeat_stream("curio-mv")
}

/// GET /enrichment/events - live enrichment progress stream
///
/// Streams events:
/// - EnrichmentSessionStarted
/// - EnrichmentProgress (after every item)
/// - EnrichmentItemFailed
/// - EnrichmentSessionCompleted
pub async fn enrichment_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!("New SSE client connected to enrichment events");
    curio_common::sse::event_stream(&state.event_bus, is_enrichment_event)
}

fn is_enrichment_event(event: &CurioEvent) -> bool {
    matches!(
        event,
        CurioEvent::EnrichmentSessionStarted { .. }
            | CurioEvent::EnrichmentProgress { .. }
            | CurioEvent::EnrichmentItemFailed { .. }
            | CurioEvent::EnrichmentSessionCompleted { .. }
    )
}
