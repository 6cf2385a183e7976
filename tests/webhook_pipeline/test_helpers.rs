//! Shared helpers for webhook pipeline tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, dev::ServiceResponse, test, web};
use serde_json::{Value, json};
use testhub_lib::auth::{WebhookSecret, sign};
use testhub_lib::db::{MemoryStore, RunStore, StoreTimeout};
use testhub_lib::models::{NewTestRun, RunId, TestRun, TestStep};
use testhub_lib::services::EventRouter;

/// Secret shared between the test app and the signing helpers.
pub const TEST_SECRET: &str = "test-webhook-secret";

/// Store timeout used by apps that are not testing timeouts.
pub const TEST_STORE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create a test app over `store` with the test secret.
pub async fn create_test_app(
    store: Arc<MemoryStore>,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    create_test_app_with(store, Some(TEST_SECRET), TEST_STORE_TIMEOUT).await
}

/// Create a test app with an explicit secret and store timeout.
pub async fn create_test_app_with(
    store: Arc<MemoryStore>,
    secret: Option<&str>,
    store_timeout: Duration,
) -> impl actix_web::dev::Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>
{
    let store: Arc<dyn RunStore> = store;
    let router = EventRouter::new(secret.map(WebhookSecret::new), store.clone(), store_timeout);

    test::init_service(
        App::new()
            .app_data(web::Data::new(router))
            .app_data(web::Data::new(store))
            .app_data(web::Data::new(StoreTimeout(store_timeout)))
            .service(web::scope("/api/v1").configure(testhub_lib::api::configure)),
    )
    .await
}

/// Insert a pending run the way the dispatcher would.
pub async fn seed_run(store: &MemoryStore, id: &str) -> RunId {
    let run_id = RunId::parse(id).unwrap();
    store
        .create_run(NewTestRun::pending(run_id.clone(), "checkout flow", "project-1"))
        .await
        .expect("Failed to seed run");
    run_id
}

pub async fn stored_run(store: &MemoryStore, run_id: &RunId) -> TestRun {
    store
        .find_run(run_id)
        .await
        .unwrap()
        .expect("run should exist")
}

pub async fn stored_steps(store: &MemoryStore, run_id: &RunId) -> Vec<TestStep> {
    store.list_steps(run_id).await.unwrap()
}

/// `sha256=<hex>` signature for `body` under the test secret.
pub fn signature_for(body: &[u8]) -> String {
    sign(&WebhookSecret::new(TEST_SECRET), body)
}

/// POST raw bytes to the webhook endpoint with an optional signature header.
pub async fn post_raw<S>(
    app: &S,
    body: Vec<u8>,
    signature_header: Option<(&str, String)>,
) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let mut req = test::TestRequest::post()
        .uri("/api/v1/webhooks/github")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-GitHub-Delivery", "test-delivery"));
    if let Some(header) = signature_header {
        req = req.insert_header(header);
    }

    let resp = test::call_service(app, req.set_payload(body).to_request()).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// POST a correctly signed JSON payload.
pub async fn post_signed<S>(app: &S, payload: &Value) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let body = serde_json::to_vec(payload).unwrap();
    let signature = signature_for(&body);
    post_raw(app, body, Some(("X-Hub-Signature-256", signature))).await
}

/// GET a path and decode the JSON body.
pub async fn get_json<S>(app: &S, uri: &str) -> (u16, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse,
            Error = actix_web::Error,
        >,
{
    let req = test::TestRequest::get().uri(uri).to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status().as_u16();
    let bytes = test::read_body(resp).await;
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// `workflow_run.completed` event correlated through the dispatch input.
pub fn workflow_completed(run_id: &str, conclusion: &str) -> Value {
    json!({
        "action": "completed",
        "workflow_run": {
            "status": "completed",
            "conclusion": conclusion,
            "head_sha": "abc123",
            "head_commit": {"message": "Nightly checkout run"},
            "html_url": "https://github.com/acme/shop/actions/runs/1",
            "inputs": {"run_id": run_id},
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:42Z"
        }
    })
}

/// `workflow_run.in_progress` event correlated through the dispatch input.
pub fn workflow_in_progress(run_id: &str) -> Value {
    json!({
        "action": "in_progress",
        "workflow_run": {
            "status": "in_progress",
            "head_sha": "abc123",
            "inputs": {"run_id": run_id}
        }
    })
}
