//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE plumbing for the Curio services: a heartbeat-only stream for
//! connection status monitoring, and a bridge that forwards selected
//! [`CurioEvent`]s from the [`EventBus`] to an SSE client.

use crate::events::{CurioEvent, EventBus};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Create a heartbeat-only SSE stream for connection status monitoring
pub fn heartbeat_stream(
    service_name: &'static str,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!(service = service_name, "New SSE client connected to general events");

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data("connected"));

        loop {
            tokio::time::sleep(HEARTBEAT_INTERVAL).await;
            debug!(service = service_name, "SSE heartbeat");
            yield Ok(Event::default().comment("heartbeat"));
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}

/// Bridge bus events matching `filter` onto an SSE stream
///
/// Heartbeats are interleaved so proxies do not drop idle connections. A
/// lagged subscriber resumes with the next available event; serialization
/// failures are logged and the offending event skipped.
pub fn event_stream(
    bus: &EventBus,
    filter: fn(&CurioEvent) -> bool,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let mut rx = bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) if filter(&event) => {
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    yield Ok(Event::default()
                                        .event(event.event_type())
                                        .data(json));
                                }
                                Err(e) => {
                                    warn!(
                                        event_type = event.event_type(),
                                        error = %e,
                                        "SSE: failed to serialize event"
                                    );
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE client lagged, events dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(HEARTBEAT_INTERVAL)
        .text("heartbeat")
}
