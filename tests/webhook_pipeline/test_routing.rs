//! Event routing: ignored shapes, uncorrelated events, parse errors, store failures.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use testhub_lib::db::MemoryStore;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_uncorrelated_event_is_acknowledged_without_store_calls() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store.clone()).await;

    let payload = json!({
        "action": "completed",
        "workflow_run": {
            "status": "completed",
            "conclusion": "success",
            "head_commit": {"message": "Bump dependencies"}
        }
    });
    let (status, body) = post_signed(&app, &payload).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"]["result"], "uncorrelated");
    assert_eq!(store.calls(), 0);
}

#[actix_rt::test]
async fn test_unrecognized_shapes_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store.clone()).await;

    for payload in [
        json!({"zen": "Design for failure.", "hook_id": 1}),
        json!({"action": "requested", "workflow_run": {"inputs": {"run_id": "R1"}}}),
        json!({"action": "opened", "pull_request": {}}),
    ] {
        let (status, body) = post_signed(&app, &payload).await;
        assert_eq!(status, 200);
        assert_eq!(body["outcome"]["result"], "ignored");
    }
    assert_eq!(store.calls(), 0);
}

#[actix_rt::test]
async fn test_malformed_json_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store.clone()).await;

    let body = b"{\"action\": \"completed\",".to_vec();
    let signature = signature_for(&body);
    let (status, body) = post_raw(&app, body, Some(("X-Hub-Signature-256", signature))).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(store.calls(), 0);
}

#[actix_rt::test]
async fn test_store_timeout_is_retryable() {
    let store = Arc::new(MemoryStore::with_latency(Duration::from_millis(500)));
    let app = create_test_app_with(store, Some(TEST_SECRET), Duration::from_millis(20)).await;

    let (status, body) = post_signed(&app, &workflow_completed("R1", "success")).await;

    assert_eq!(status, 503);
    assert_eq!(body["error"], "STORE_UNAVAILABLE");
}
