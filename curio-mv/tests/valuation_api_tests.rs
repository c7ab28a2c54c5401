//! Valuation API integration tests
//!
//! Drives the full router with scripted providers: aggregation, quick
//! resolution, input validation, and the health endpoint.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{estimate_payload, grade_payload, test_app, ScriptedProvider};
use curio_mv::build_router;
use curio_mv::providers::ValuationProvider;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_valuation_aggregates_and_scores() {
    let providers: Vec<Arc<dyn ValuationProvider>> = vec![
        Arc::new(ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0))),
        Arc::new(ScriptedProvider::succeeding("PriceCharting", grade_payload("raw", 90.0))),
        Arc::new(ScriptedProvider::succeeding("eBay", estimate_payload(100.0))),
    ];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json(
            "/valuation",
            json!({"query": {"title": "Saga", "issue_number": "1"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["success"], json!(true));
    // Raw query selects the "raw" bucket: median of [80, 90].
    assert_eq!(body["recommended_grade_key"], json!("raw"));
    assert_eq!(body["recommended_value"], json!(85.0));
    assert_eq!(body["value_range"]["low"], json!(80.0));
    assert_eq!(body["value_range"]["high"], json!(90.0));
    // The estimate landed in its own "current" bucket.
    assert!(body["fmv_by_grade"]["current"].is_object());
    assert!(body["confidence"]["score"].is_u64());
}

#[tokio::test]
async fn test_valuation_blank_title_is_rejected_before_providers() {
    let gocollect = ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0));
    let calls = gocollect.call_counter();
    let providers: Vec<Arc<dyn ValuationProvider>> = vec![Arc::new(gocollect)];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json("/valuation", json!({"query": {"title": "  "}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
    assert_eq!(
        calls.load(std::sync::atomic::Ordering::SeqCst),
        0,
        "malformed input must be rejected before any provider call"
    );
}

#[tokio::test]
async fn test_valuation_exhaustion_is_http_200() {
    let providers: Vec<Arc<dyn ValuationProvider>> = vec![
        Arc::new(ScriptedProvider::failing("GoCollect")),
        Arc::new(ScriptedProvider::failing("eBay")),
    ];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json("/valuation", json!({"query": {"title": "Saga"}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "exhaustion is payload data, not transport failure");
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["recommended_value"], json!(0.0));
    assert_eq!(body["confidence"]["level"], json!("low"));
    assert_eq!(body["confidence"]["score"], json!(0));
}

#[tokio::test]
async fn test_valuation_include_sources_narrows_fanout() {
    let gocollect = ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0));
    let ebay = ScriptedProvider::succeeding("eBay", estimate_payload(100.0));
    let ebay_calls = ebay.call_counter();

    let providers: Vec<Arc<dyn ValuationProvider>> = vec![Arc::new(gocollect), Arc::new(ebay)];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json(
            "/valuation",
            json!({
                "query": {"title": "Saga"},
                "include_sources": ["GoCollect"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(ebay_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_quick_valuation_first_tier_wins() {
    let providers: Vec<Arc<dyn ValuationProvider>> = vec![
        Arc::new(ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0))),
        Arc::new(ScriptedProvider::succeeding("eBay", estimate_payload(100.0))),
    ];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json("/valuation/quick", json!({"query": {"title": "Saga"}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["value"], json!(80.0));
    assert_eq!(body["source"], json!("GoCollect"));
}

#[tokio::test]
async fn test_quick_valuation_unavailable_is_null_not_zero() {
    let providers: Vec<Arc<dyn ValuationProvider>> =
        vec![Arc::new(ScriptedProvider::failing("GoCollect"))];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json("/valuation/quick", json!({"query": {"title": "Saga"}})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["value"], Value::Null);
    assert_eq!(body["source"], Value::Null);
}

#[tokio::test]
async fn test_quick_valuation_respects_tier_override() {
    let gocollect = ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0));
    let gocollect_calls = gocollect.call_counter();
    let providers: Vec<Arc<dyn ValuationProvider>> = vec![
        Arc::new(gocollect),
        Arc::new(ScriptedProvider::succeeding("eBay", estimate_payload(100.0))),
    ];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(post_json(
            "/valuation/quick",
            json!({"query": {"title": "Saga"}, "tiers": ["eBay"]}),
        ))
        .await
        .unwrap();

    let body = response_json(response).await;
    assert_eq!(body["source"], json!("eBay"));
    assert_eq!(gocollect_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let providers: Vec<Arc<dyn ValuationProvider>> =
        vec![Arc::new(ScriptedProvider::succeeding("GoCollect", grade_payload("raw", 80.0)))];
    let app = build_router(test_app(providers).state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["module"], json!("curio-mv"));
    assert_eq!(body["providers"], json!(["GoCollect"]));
}
