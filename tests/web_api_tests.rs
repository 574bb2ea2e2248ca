//! Integration tests for the geobatch Web API.
//!
//! These drive the full router through `tower::ServiceExt::oneshot`,
//! exercising the request/response boundary end to end: validation before
//! kernel calls, the error taxonomy's HTTP mapping, and the batch
//! pipeline.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use geobatch::config::Config;
use geobatch::web::{create_router, AppState};

/// Creates a router with default configuration.
fn create_test_app() -> axum::Router {
    create_router(AppState::new(Config::default()))
}

/// Helper to make a GET request and get the response body as JSON.
async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    (status, json)
}

/// Helper to make a POST request with a JSON body.
async fn post_json(app: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_json_with_key(app, uri, body, None).await
}

/// Helper to make a POST request with a JSON body and optional API key.
async fn post_json_with_key(
    app: &axum::Router,
    uri: &str,
    body: Value,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }

    let response = app
        .clone()
        .oneshot(
            builder
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}

fn unit_square() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]]
    })
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();

    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_service_info() {
    let app = create_test_app();

    let (status, json) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "geo-buffer-intersect-batch");
}

// ============================================================================
// Operation Endpoint Tests
// ============================================================================

#[tokio::test]
async fn test_area_of_unit_square() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "area", "geometry": unit_square() }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], 1.0);
}

#[tokio::test]
async fn test_non_finite_coordinate_is_an_input_error() {
    let app = create_test_app();

    // A string in a coordinate position never reaches a kernel.
    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "area",
            "geometry": { "type": "Point", "coordinates": [0, "NaN"] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input");
}

#[tokio::test]
async fn test_unclosed_ring_is_an_input_error() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "area",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]]
            }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input");
}

#[tokio::test]
async fn test_unknown_operation_is_an_input_error() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "tessellate", "geometry": unit_square() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input");
}

#[tokio::test]
async fn test_buffer_requires_distance() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "buffer", "geometry": unit_square() }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("distance"));
}

#[tokio::test]
async fn test_buffer_returns_larger_geometry() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "buffer", "geometry": unit_square(), "distance": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["type"], "MultiPolygon");

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "area", "geometry": json["result"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // s^2 + 4sr + pi r^2 for the dilated unit square, minus arc chords.
    let area = json["result"].as_f64().unwrap();
    assert!(area > 7.9 && area < 8.2, "area = {area}");
}

#[tokio::test]
async fn test_union_of_points_is_a_kernel_error() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "union",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "other": { "type": "Point", "coordinates": [1.0, 1.0] }
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "kernel");
}

#[tokio::test]
async fn test_intersection_of_overlapping_squares() {
    let app = create_test_app();

    let other = json!({
        "type": "Polygon",
        "coordinates": [[[0.5, 0.5], [0.5, 2.0], [2.0, 2.0], [2.0, 0.5], [0.5, 0.5]]]
    });
    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "intersection", "geometry": unit_square(), "other": other }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "area", "geometry": json["result"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let area = json["result"].as_f64().unwrap();
    assert!((area - 0.25).abs() < 1e-9, "area = {area}");
}

#[tokio::test]
async fn test_is_valid_flags_bowtie() {
    let app = create_test_app();

    let bowtie = json!({
        "type": "Polygon",
        "coordinates": [[[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]
    });
    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({ "op": "is_valid", "geometry": bowtie }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], false);
}

// ============================================================================
// Transform Tests
// ============================================================================

#[tokio::test]
async fn test_transform_identity_preserves_coordinates() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "transform",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "source_crs": "EPSG:4326",
            "target_crs": "EPSG:4326"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let coords = json["result"]["coordinates"].as_array().unwrap();
    assert!(coords[0].as_f64().unwrap().abs() < 1e-9);
    assert!(coords[1].as_f64().unwrap().abs() < 1e-9);
}

#[tokio::test]
async fn test_transform_to_web_mercator() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "transform",
            "geometry": { "type": "Point", "coordinates": [10.0, 0.0] },
            "source_crs": "EPSG:4326",
            "target_crs": "EPSG:3857"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let coords = json["result"]["coordinates"].as_array().unwrap();
    assert!((coords[0].as_f64().unwrap() - 1_113_194.907_932_735_7).abs() < 1e-6);
    assert!(coords[1].as_f64().unwrap().abs() < 1e-6);
}

#[tokio::test]
async fn test_transform_requires_both_descriptors() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "transform",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "source_crs": "EPSG:4326"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input");
    assert!(json["error"].as_str().unwrap().contains("target_crs"));
}

#[tokio::test]
async fn test_unresolvable_crs_is_a_kernel_error() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/api/operations",
        json!({
            "op": "transform",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] },
            "source_crs": "EPSG:4326",
            "target_crs": "EPSG:99999"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "kernel");
    assert!(json["error"].as_str().unwrap().contains("EPSG:99999"));
}

// ============================================================================
// Batch Endpoint Tests
// ============================================================================

fn square_fc(min: f64, max: f64) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [min, min], [min, max], [max, max], [max, min], [min, min]
                ]]
            }
        }]
    })
}

#[tokio::test]
async fn test_batch_reports_overlap() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/buffer-intersect-batch",
        json!({
            "items": [{
                "json": {
                    "coop": { "name": "farm.geojson", "geojson": square_fc(0.0, 0.01) },
                    "protected": { "name": "park.geojson", "geojson": square_fc(0.02, 0.06) }
                }
            }]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);

    let out = &records[0]["json"];
    assert_eq!(out["coop"], "farm");
    assert_eq!(out["protected"], "park");
    assert_eq!(out["overlapFile"], "farm__x__park__overlap_10km.geojson");
    assert_eq!(out["overlap_feature_count"], 1);
    assert!(out["overlap_area_km2"].as_f64().unwrap() > 0.0);
    assert_eq!(out["overlap_geojson"]["type"], "FeatureCollection");
}

#[tokio::test]
async fn test_batch_item_failure_does_not_fail_the_batch() {
    let app = create_test_app();

    let (status, json) = post_json(
        &app,
        "/buffer-intersect-batch",
        json!({
            "items": [
                { "json": { "coop": 42, "protected": {} } },
                { "json": {
                    "coop": {
                        "name": "farm",
                        "geojson": { "type": "FeatureCollection", "features": [] }
                    },
                    "protected": {
                        "name": "park",
                        "geojson": { "type": "FeatureCollection", "features": [] }
                    }
                } }
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]["json"]["error"].is_string());
    assert_eq!(records[1]["json"]["overlap_feature_count"], 0);
}

#[tokio::test]
async fn test_batch_rejects_malformed_envelope() {
    let app = create_test_app();

    let (status, json) = post_json(&app, "/buffer-intersect-batch", json!({ "rows": [] })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "input");
}

// ============================================================================
// API Key Tests
// ============================================================================

fn create_keyed_app() -> axum::Router {
    let config = Config {
        api_key: Some("secret".to_string()),
        ..Config::default()
    };
    create_router(AppState::new(config))
}

#[tokio::test]
async fn test_post_requires_api_key_when_configured() {
    let app = create_keyed_app();

    let body = json!({ "op": "area", "geometry": unit_square() });

    let (status, json) = post_json(&app, "/api/operations", body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Unauthorized");

    let (status, _) = post_json_with_key(&app, "/api/operations", body.clone(), Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = post_json_with_key(&app, "/api/operations", body, Some("secret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], 1.0);
}

#[tokio::test]
async fn test_health_does_not_require_api_key() {
    let app = create_keyed_app();

    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
