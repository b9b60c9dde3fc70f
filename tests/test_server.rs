//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delta_anomaly::server::{create_router, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_body_size: 64 * 1024,
    };
    create_router(&config)
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = test_app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn score(body: Value) -> (StatusCode, Value) {
    send(post_json("/ai/isolation-forest", body.to_string())).await
}

// ============================================================================
// Scoring
// ============================================================================

#[tokio::test]
async fn test_far_outlier_is_flagged() {
    let (status, json) = score(json!({
        "deltaTimes": [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 100.0]
    }))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["isAnomaly"], true);
    assert!(json["anomalyScore"].as_f64().unwrap() < -0.1);
}

#[tokio::test]
async fn test_homogeneous_batch_is_normal() {
    let (status, json) = score(json!({ "deltaTimes": [5.0, 5.0, 5.0, 5.0, 5.0] })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["anomalyScore"].as_f64(), Some(0.0));
    assert_eq!(json["isAnomaly"], false);
}

#[tokio::test]
async fn test_single_value_does_not_crash() {
    let (status, json) = score(json!({ "deltaTimes": [42.0] })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["anomalyScore"].as_f64(), Some(0.0));
    assert_eq!(json["isAnomaly"], false);
}

#[tokio::test]
async fn test_integer_values_are_accepted() {
    let (status, json) = score(json!({ "deltaTimes": [1800000, 1750000, 1900000, 9600000, 1820000] })).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["anomalyScore"].is_number());
    assert!(json["isAnomaly"].is_boolean());
}

#[tokio::test]
async fn test_responses_are_deterministic_and_consistent() {
    let batches = [
        json!([12.5, 13.1, 11.9, 12.7, 30.2, 12.2, 12.9]),
        json!([0.0, 1800000.0, 1750000.0, 1900000.0, 1820000.0, 9600000.0]),
        json!([3.0, 3.1, 2.9, 3.05]),
    ];

    for batch in batches {
        let (_, first) = score(json!({ "deltaTimes": batch })).await;
        let (_, second) = score(json!({ "deltaTimes": batch })).await;

        let a = first["anomalyScore"].as_f64().unwrap();
        let b = second["anomalyScore"].as_f64().unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(first["isAnomaly"].as_bool().unwrap(), a < -0.1);
    }
}

#[tokio::test]
async fn test_extra_fields_are_ignored() {
    let (status, _) = score(json!({ "deltaTimes": [1.0, 2.0], "shipmentId": "S-1" })).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_string_elements_are_rejected() {
    let (status, json) = score(json!({ "deltaTimes": ["a", "b"] })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], true);
    assert_eq!(json["detail"][0]["loc"], json!(["body", "deltaTimes", 0]));
    assert_eq!(json["detail"][0]["type"], "type_error");
}

#[tokio::test]
async fn test_empty_list_is_rejected() {
    let (status, json) = score(json!({ "deltaTimes": [] })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"][0]["loc"], json!(["body", "deltaTimes"]));
    assert_eq!(json["detail"][0]["type"], "too_short");
}

#[tokio::test]
async fn test_missing_field_is_rejected() {
    let (status, json) = score(json!({ "delta_times": [1.0, 2.0] })).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"][0]["loc"], json!(["body", "deltaTimes"]));
    assert_eq!(json["detail"][0]["type"], "missing");
}

#[tokio::test]
async fn test_wrong_container_type_is_rejected() {
    let (status, _) = score(json!({ "deltaTimes": "1,2,3" })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (status, json) = send(post_json("/ai/isolation-forest", "{\"deltaTimes\": [1.0,".to_string())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["detail"][0]["type"], "json_invalid");
}

#[tokio::test]
async fn test_nan_literal_is_rejected() {
    let (status, _) = send(post_json("/ai/isolation-forest", "{\"deltaTimes\": [1.0, NaN]}".to_string())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let values: Vec<f64> = (0..20_000).map(|i| i as f64).collect();
    let (status, _) = score(json!({ "deltaTimes": values })).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = send(
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (status, json) = send(
        Request::builder()
            .uri("/ai/unknown")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], true);
}

#[tokio::test]
async fn test_get_on_score_route_returns_405() {
    let (status, json) = send(
        Request::builder()
            .uri("/ai/isolation-forest")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["error"], true);
}
