//! Valuation API handlers
//!
//! POST /valuation (full aggregation) and POST /valuation/quick (tiered
//! resolution). Both return 200 even when the payload reports
//! `success:false` - aggregation exhaustion is data, not a transport
//! failure. Only malformed input (an unidentifiable item) is rejected with
//! 400, before any provider is contacted.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    models::{AggregatedValuation, ItemQuery},
    AppState,
};

/// POST /valuation request
#[derive(Debug, Deserialize)]
pub struct ValuationRequest {
    pub query: ItemQuery,
    /// Restrict the fan-out to these providers; default is all of them
    #[serde(default)]
    pub include_sources: Option<Vec<String>>,
}

/// POST /valuation/quick request
#[derive(Debug, Deserialize)]
pub struct QuickValuationRequest {
    pub query: ItemQuery,
    /// Provider priority override; default is the built-in tier order
    #[serde(default)]
    pub tiers: Option<Vec<String>>,
}

/// POST /valuation/quick response
///
/// `value: null` means "unavailable": the caller must prompt for manual
/// entry rather than show a zero.
#[derive(Debug, Serialize)]
pub struct QuickValuationResponse {
    pub value: Option<f64>,
    pub source: Option<String>,
}

/// POST /valuation
///
/// Fan out to the selected providers and aggregate the answers into one
/// confidence-scored valuation.
pub async fn post_valuation(
    State(state): State<AppState>,
    Json(request): Json<ValuationRequest>,
) -> ApiResult<Json<AggregatedValuation>> {
    request
        .query
        .validate()
        .map_err(ApiError::BadRequest)?;

    let valuation = state
        .engine
        .aggregate_valuation(&request.query, request.include_sources.as_deref())
        .await;

    tracing::debug!(
        title = %request.query.title,
        success = valuation.success,
        confidence = valuation.confidence.score,
        "valuation request served"
    );

    Ok(Json(valuation))
}

/// POST /valuation/quick
///
/// First usable value in tier priority order, for callers that need one
/// number fast rather than a confidence report.
pub async fn post_quick_valuation(
    State(state): State<AppState>,
    Json(request): Json<QuickValuationRequest>,
) -> ApiResult<Json<QuickValuationResponse>> {
    request
        .query
        .validate()
        .map_err(ApiError::BadRequest)?;

    let resolved = state
        .engine
        .quick_value(&request.query, request.tiers.as_deref())
        .await;

    let response = match resolved {
        Some(found) => QuickValuationResponse {
            value: Some(found.value),
            source: Some(found.source),
        },
        None => QuickValuationResponse {
            value: None,
            source: None,
        },
    };

    Ok(Json(response))
}

/// Build valuation routes
pub fn valuation_routes() -> Router<AppState> {
    Router::new()
        .route("/valuation", post(post_valuation))
        .route("/valuation/quick", post(post_quick_valuation))
}
