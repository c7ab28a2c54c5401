//! Batch enrichment API handlers
//!
//! POST /enrichment/start, GET /enrichment/status, POST /enrichment/cancel

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{EnrichmentProgress, EnrichmentState},
    services::StartError,
    AppState,
};

/// POST /enrichment/start request
#[derive(Debug, Default, Deserialize)]
pub struct StartEnrichmentRequest {
    /// Inter-item delay override in milliseconds
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

/// POST /enrichment/start response
#[derive(Debug, Serialize)]
pub struct StartEnrichmentResponse {
    pub session_id: Uuid,
    pub state: EnrichmentState,
    pub total: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// GET /enrichment/status response
#[derive(Debug, Serialize)]
pub struct EnrichmentStatusResponse {
    pub session_id: Uuid,
    pub state: EnrichmentState,
    pub progress: EnrichmentProgress,
    pub enriched: usize,
    pub error_count: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// POST /enrichment/cancel response
#[derive(Debug, Serialize)]
pub struct CancelEnrichmentResponse {
    pub cancelling: bool,
}

/// POST /enrichment/start
///
/// Begin a batch enrichment run over every item still missing data.
/// Returns 202 Accepted with the session id, or 409 when a run is already
/// in progress.
pub async fn start_enrichment(
    State(state): State<AppState>,
    request: Option<Json<StartEnrichmentRequest>>,
) -> ApiResult<(StatusCode, Json<StartEnrichmentResponse>)> {
    let request = request.map(|Json(body)| body).unwrap_or_default();
    let delay_override = request.delay_ms.map(Duration::from_millis);

    let session = state
        .orchestrator
        .start(delay_override)
        .await
        .map_err(|e| match e {
            StartError::AlreadyRunning => ApiError::Conflict(e.to_string()),
            StartError::Store(inner) => ApiError::Common(inner),
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartEnrichmentResponse {
            session_id: session.session_id,
            state: session.state,
            total: session.progress.total,
            started_at: session.started_at,
        }),
    ))
}

/// GET /enrichment/status
///
/// Progress of the current (or most recent) run.
pub async fn get_enrichment_status(
    State(state): State<AppState>,
) -> ApiResult<Json<EnrichmentStatusResponse>> {
    let session = state
        .orchestrator
        .session()
        .await
        .ok_or_else(|| ApiError::NotFound("no enrichment run has been started".to_string()))?;

    Ok(Json(EnrichmentStatusResponse {
        session_id: session.session_id,
        state: session.state,
        progress: session.progress,
        enriched: session.enriched,
        error_count: session.errors.len(),
        started_at: session.started_at,
        ended_at: session.ended_at,
    }))
}

/// POST /enrichment/cancel
///
/// Request cancellation at the next item boundary. The item currently in
/// flight always finishes.
pub async fn cancel_enrichment(
    State(state): State<AppState>,
) -> ApiResult<Json<CancelEnrichmentResponse>> {
    let cancelling = state.orchestrator.cancel().await;
    if !cancelling {
        return Err(ApiError::NotFound("no enrichment run in progress".to_string()));
    }

    tracing::info!("enrichment cancellation requested");
    Ok(Json(CancelEnrichmentResponse { cancelling }))
}

/// Build enrichment routes
pub fn enrichment_routes() -> Router<AppState> {
    Router::new()
        .route("/enrichment/start", post(start_enrichment))
        .route("/enrichment/status", get(get_enrichment_status))
        .route("/enrichment/cancel", post(cancel_enrichment))
}
