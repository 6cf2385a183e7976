//! Signature verification at the HTTP boundary.

use std::sync::Arc;

use actix_web::test;
use serde_json::json;
use testhub_lib::db::MemoryStore;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_signed_delivery_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store).await;

    let (status, body) = post_signed(&app, &json!({"zen": "Keep it logically awesome."})).await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[actix_rt::test]
async fn test_missing_signature_is_rejected_without_side_effects() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;
    let calls_before = store.calls();

    let body = serde_json::to_vec(&workflow_completed("R1", "success")).unwrap();
    let (status, body) = post_raw(&app, body, None).await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(store.calls(), calls_before);
    assert_eq!(stored_run(&store, &run_id).await.status.as_str(), "pending");
}

#[actix_rt::test]
async fn test_wrong_secret_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store).await;

    let body = serde_json::to_vec(&json!({"zen": "hi"})).unwrap();
    let forged = testhub_lib::auth::sign(&testhub_lib::auth::WebhookSecret::new("other"), &body);
    let (status, _) = post_raw(&app, body, Some(("X-Hub-Signature-256", forged))).await;

    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_fallback_header_without_prefix_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store).await;

    let body = serde_json::to_vec(&json!({"zen": "hi"})).unwrap();
    let bare = signature_for(&body).trim_start_matches("sha256=").to_string();
    let (status, _) = post_raw(&app, body, Some(("X-Signature", bare))).await;

    assert_eq!(status, 200);
}

#[actix_rt::test]
async fn test_reporter_header_takes_precedence() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store).await;

    let body = serde_json::to_vec(&json!({"zen": "hi"})).unwrap();
    let valid = signature_for(&body);
    let forged = testhub_lib::auth::sign(&testhub_lib::auth::WebhookSecret::new("other"), &body);

    for (reporter, github, expected) in [
        (valid.clone(), forged.clone(), 200),
        (forged.clone(), valid.clone(), 401),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/webhooks/github")
            .insert_header(("Content-Type", "application/json"))
            .insert_header(("X-Signature", reporter))
            .insert_header(("X-Hub-Signature-256", github))
            .set_payload(body.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), expected);
    }
}

#[actix_rt::test]
async fn test_reformatted_body_does_not_verify() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store).await;

    let payload = json!({"action": "completed", "workflow_run": {"status": "completed"}});
    let pretty = serde_json::to_vec_pretty(&payload).unwrap();
    let compact = serde_json::to_vec(&payload).unwrap();
    let signature = signature_for(&pretty);

    let (status, _) = post_raw(&app, compact, Some(("X-Hub-Signature-256", signature))).await;

    assert_eq!(status, 401);
}

#[actix_rt::test]
async fn test_unset_secret_rejects_everything() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app_with(store, None, TEST_STORE_TIMEOUT).await;

    let (status, body) = post_signed(&app, &json!({"zen": "hi"})).await;

    assert_eq!(status, 401);
    assert_eq!(body["error"], "UNAUTHORIZED");
}
