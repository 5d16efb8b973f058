// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health, GET /crops
// - POST /recommend (valid, rejected, clamped, body lang, extractor errors)
// - GET /market/{crop}, GET /market/{crop}/history
// - GET /weather/{city}
// - POST /disease/detect (fallback path, invalid upload, size limits)
// - POST /chat/intent

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use kisan_advisor::api;
use kisan_advisor::config::AdvisorConfig;
use kisan_advisor::{AppState, Catalog, InputPolicy};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_config(policy: InputPolicy) -> AdvisorConfig {
    let mut cfg = AdvisorConfig::default();
    cfg.engine.jitter_seed = Some(7);
    cfg.engine.input_policy = policy;
    cfg
}

/// Build the same Router the binary uses (minus /metrics).
fn test_router_with(policy: InputPolicy) -> Router {
    let state = AppState::new(test_config(policy), Catalog::builtin()).expect("state");
    api::router(state)
}

fn upload(bytes: usize) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/disease/detect")
        .header("content-type", "image/png")
        .body(Body::from(vec![0x89u8; bytes]))
        .expect("build POST /disease/detect")
}

fn test_router() -> Router {
    test_router_with(InputPolicy::Reject)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

fn form(humidity: f64) -> Json {
    json!({
        "nitrogen": 50, "phosphorus": 40, "potassium": 40,
        "temperature": 28, "humidity": humidity, "ph": 6.5, "rainfall": 200
    })
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let resp = test_router().oneshot(get("/health")).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok");
}

#[tokio::test]
async fn api_crops_lists_catalog_in_requested_language() {
    let (status, v) = send(test_router(), get("/crops?lang=hi")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = v.as_array().expect("array");
    assert_eq!(arr.len(), 10);
    assert_eq!(arr[0]["name"], "Rice");
    assert_eq!(arr[0]["display_name"], "चावल/धान");
    assert_eq!(arr[4]["season"], "all");
}

#[tokio::test]
async fn api_recommend_returns_three_ranked_crops() {
    let (status, v) = send(test_router(), post_json("/recommend", &form(80.0))).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");

    let crops = v["crops"].as_array().expect("crops array");
    assert_eq!(crops.len(), 3);
    let ranks: Vec<u64> = crops.iter().map(|c| c["rank"].as_u64().unwrap()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    // Rice stacks 105 points before the ceiling; nothing else can reach 98.
    assert_eq!(crops[0]["name"], "Rice");
    assert_eq!(crops[0]["match_percent"], 98);
    assert_eq!(crops[0]["reasons"].as_array().map(Vec::len), Some(3));
    assert_eq!(crops[0]["mandi_price"]["market"], "Nagpur");

    // Contract checks for UI consumers
    assert_eq!(v["summary"]["season"], "Kharif");
    assert!(v["labels"]["climate"].is_string());
}

#[tokio::test]
async fn api_recommend_rejects_out_of_range_input() {
    let (status, v) = send(test_router(), post_json("/recommend", &form(120.0))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["error"]["code"], "INPUT_OUT_OF_RANGE");
    assert_eq!(v["error"]["field"], "humidity");
}

#[tokio::test]
async fn api_recommend_clamps_when_configured() {
    let app = test_router_with(InputPolicy::Clamp);
    let (status, v) = send(app, post_json("/recommend", &form(120.0))).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["crops"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn api_recommend_rejects_missing_fields() {
    let payload = json!({ "nitrogen": 50 });
    let (status, v) = send(test_router(), post_json("/recommend", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "MALFORMED_BODY");
    assert!(v["error"]["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn api_recommend_extractor_errors_are_json() {
    // No content-type header at all.
    let req = Request::builder()
        .method("POST")
        .uri("/recommend")
        .body(Body::from(form(80.0).to_string()))
        .expect("build POST");
    let (status, v) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(v["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");

    let req = Request::builder()
        .method("POST")
        .uri("/recommend")
        .header("content-type", "application/json")
        .body(Body::from("{\"nitrogen\": 50,"))
        .expect("build POST");
    let (status, v) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "MALFORMED_JSON");

    let mut wrong_type = form(80.0);
    wrong_type["ph"] = json!("acidic");
    let (status, v) = send(test_router(), post_json("/recommend", &wrong_type)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "MALFORMED_BODY");
}

#[tokio::test]
async fn api_recommend_reads_lang_from_body_or_query() {
    let mut payload = form(80.0);
    payload["lang"] = json!("hi");
    let (status, v) = send(test_router(), post_json("/recommend", &payload)).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["crops"][0]["display_name"], "चावल/धान");

    let (_, v) = send(test_router(), post_json("/recommend?lang=mr", &form(80.0))).await;
    assert_eq!(v["crops"][0]["display_name"], "तांदूळ/भात");

    // Body wins when both are given.
    let (_, v) = send(test_router(), post_json("/recommend?lang=mr", &payload)).await;
    assert_eq!(v["crops"][0]["display_name"], "चावल/धान");

    let (_, v) = send(test_router(), post_json("/recommend", &form(80.0))).await;
    assert_eq!(v["crops"][0]["display_name"], "Rice");
}

#[tokio::test]
async fn api_market_quote_exact_fuzzy_and_unknown() {
    let (status, v) = send(test_router(), get("/market/Cotton")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["price"], 6800);
    assert_eq!(v["trend"], "up");
    assert_eq!(v["matched_by"], "exact");

    let (status, v) = send(test_router(), get("/market/soyabean")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["crop"], "Soybean");
    assert_eq!(v["matched_by"], "fuzzy");

    let (status, v) = send(test_router(), get("/market/banana")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"]["code"], "UNKNOWN_CROP");
}

#[tokio::test]
async fn api_market_history_periods() {
    let (status, v) = send(test_router(), get("/market/wheat/history?period=3months")).await;
    assert_eq!(status, StatusCode::OK);
    let points = v["points"].as_array().expect("points");
    assert_eq!(points.len(), 3);
    assert_eq!(points[2]["price"], 2400);
    assert_eq!(v["period"], "3months");

    let (status, v) = send(test_router(), get("/market/wheat/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["points"].as_array().map(Vec::len), Some(6));

    let (status, v) = send(test_router(), get("/market/wheat/history?period=2weeks")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "BAD_PERIOD");
}

#[tokio::test]
async fn api_weather_with_advisory_and_prefill() {
    let (status, v) = send(test_router(), get("/weather/pune")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["weather"]["city"], "Pune");
    assert_eq!(v["advisory"]["growing_conditions"], "excellent");
    assert_eq!(v["advisory"]["soil_moisture"], "medium");
    assert_eq!(v["prefill"]["temperature"], 25.0);
    assert_eq!(v["prefill"]["humidity"], 60.0);
    assert_eq!(v["advisory"]["insights"]["irrigation"], "Normal irrigation schedule");
    assert_eq!(v["advisory"]["insights"]["disease"], "Low disease risk");

    let (status, v) = send(test_router(), get("/weather/atlantis")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"]["code"], "UNKNOWN_CITY");
}

#[tokio::test]
async fn api_disease_detect_uses_fallback_without_backend() {
    let req = Request::builder()
        .method("POST")
        .uri("/disease/detect")
        .header("content-type", "image/jpeg")
        .body(Body::from(vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x00, 0x10]))
        .expect("build POST /disease/detect");
    let (status, v) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["source"], "fallback");
    assert!(v["disease"].is_string());
    assert!(v["confidence"].as_f64().is_some_and(|c| (0.0..=100.0).contains(&c)));
}

#[tokio::test]
async fn api_disease_detect_rejects_non_images() {
    let req = Request::builder()
        .method("POST")
        .uri("/disease/detect")
        .header("content-type", "text/plain")
        .body(Body::from("not an image"))
        .expect("build POST /disease/detect");
    let (status, v) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn api_disease_detect_size_limits() {
    let mut cfg = test_config(InputPolicy::Reject);
    cfg.disease.max_image_bytes = 1000;
    let app = api::router(AppState::new(cfg, Catalog::builtin()).expect("state"));

    let (status, v) = send(app.clone(), upload(1000)).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");

    let (status, v) = send(app.clone(), upload(1001)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "INVALID_IMAGE");

    // Past the 64 KiB headroom the body limit answers before the handler.
    let resp = app.oneshot(upload(1000 + 64 * 1024 + 1)).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn api_chat_intent_classifies_and_validates() {
    let payload = json!({ "message": "kapas ka bhav kya hai" });
    let (status, v) = send(test_router(), post_json("/chat/intent", &payload)).await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["intent"], "market_sell_advice");
    assert_eq!(v["language"], "hi");
    assert_eq!(v["crops"][0]["id"], "cotton");
    assert_eq!(v["crops"][0]["catalog"], "Cotton");
    assert_eq!(v["chemical_query"], false);

    let (status, v) = send(test_router(), post_json("/chat/intent", &json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "BAD_MESSAGE");

    let (status, v) = send(test_router(), post_json("/chat/intent", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"]["code"], "MALFORMED_BODY");
}

#[tokio::test]
async fn api_metrics_route_absent_without_recorder() {
    let resp = test_router().oneshot(get("/metrics")).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
