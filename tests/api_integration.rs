//! Integration tests for the HTTP API
//!
//! Tests API endpoints against a controller running the simulated box

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fencehp::core::{
    create_router, event_channel, AppState, Clock, Controller, SimulatedConnector, SimulatedInputs,
    SystemClock,
};
use fencehp::types::{Event, Settings, StatusCode as Code};
use serde_json::{json, Value};
use tower::ServiceExt;

fn start_state() -> Arc<AppState> {
    let (tx, rx) = event_channel();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let connector = Arc::new(SimulatedConnector::new(SimulatedInputs::new(), Arc::clone(&clock)));
    let mut controller = Controller::new(Settings::default(), connector, clock, tx);
    controller.start().unwrap();
    AppState::start(controller, rx)
}

async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = create_router(Arc::clone(state))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(state: &Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = create_router(Arc::clone(state))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn settings_body(max_hp: &str) -> Value {
    json!({
        "hit_damage": "10",
        "self_hit_damage": "10",
        "damage_per_ms": "0.075",
        "max_hp": max_hp,
        "debounce_secs": "0.3",
        "grace_delay_secs": "0.03",
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = start_state();
    let (status, json) = get_json(&state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions_started"], 1);

    state.shutdown();
}

#[tokio::test]
async fn test_score_reports_settings_and_board() {
    let state = start_state();
    let (status, json) = get_json(&state, "/score").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["settings"]["max_hp"], 250.0);
    assert_eq!(json["scoreboard"]["max_hp"], 250.0);
    assert_eq!(json["scoreboard"]["hp"]["left"], 250.0);

    state.shutdown();
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let state = start_state();
    let (status, json) = post_json(&state, "/settings", settings_body("a lot")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("max_hp"));

    let (_, score) = get_json(&state, "/score").await;
    assert_eq!(score["settings"]["max_hp"], 250.0);
    let (_, health) = get_json(&state, "/health").await;
    assert_eq!(health["sessions_started"], 1);
    assert_eq!(health["monitoring"], true);

    state.shutdown();
}

#[tokio::test]
async fn test_negative_damage_rejected() {
    let state = start_state();
    let mut body = settings_body("250");
    body["hit_damage"] = json!("-5");
    let (status, _) = post_json(&state, "/settings", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    state.shutdown();
}

#[tokio::test]
async fn test_apply_settings_restarts_session() {
    let state = start_state();
    let (status, json) = post_json(&state, "/settings", settings_body("100")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["max_hp"], 100.0);

    let (_, score) = get_json(&state, "/score").await;
    assert_eq!(score["settings"]["max_hp"], 100.0);
    let (_, health) = get_json(&state, "/health").await;
    assert_eq!(health["sessions_started"], 2);

    state.shutdown();
}

#[tokio::test]
async fn test_reset_is_broadcast() {
    let state = start_state();
    let mut updates = state.updates.subscribe();

    let (status, json) = post_json(&state, "/reset", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["max_hp"], 250.0);

    let announced = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(Event::Status { code: Code::S303_NEW_GAME, .. }) = updates.recv().await {
                return true;
            }
        }
    })
    .await;
    assert!(matches!(announced, Ok(true)));

    state.shutdown();
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let state = start_state();
    let (status, _) = get_json(&state, "/session/new").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    state.shutdown();
}
