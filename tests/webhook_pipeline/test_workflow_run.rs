//! Workflow-run deliveries: status mapping, metadata, steps and artifacts.

use std::sync::Arc;

use serde_json::json;
use testhub_lib::db::MemoryStore;
use testhub_lib::models::{RunStatus, StepStatus};

use super::test_helpers::*;

#[actix_rt::test]
async fn test_successful_completion() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let (status, body) = post_signed(&app, &workflow_completed("R1", "success")).await;

    assert_eq!(status, 200);
    assert_eq!(body["outcome"]["result"], "applied");
    assert_eq!(body["outcome"]["run_id"], "R1");
    assert_eq!(body["outcome"]["status"], "completed");

    let run = stored_run(&store, &run_id).await;
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.completed_at.is_some());
    assert_eq!(run.commit_sha.as_deref(), Some("abc123"));
    assert_eq!(run.commit_message.as_deref(), Some("Nightly checkout run"));
    assert_eq!(
        run.workflow_url.as_deref(),
        Some("https://github.com/acme/shop/actions/runs/1")
    );
    assert!(run.summary.unwrap().contains("completed successfully"));
}

#[actix_rt::test]
async fn test_failure_summary_reports_elapsed_time() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    post_signed(&app, &workflow_completed("R1", "failure")).await;

    let run = stored_run(&store, &run_id).await;
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.summary.unwrap().contains("42s"));
}

#[actix_rt::test]
async fn test_unknown_conclusion_is_a_failure() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    post_signed(&app, &workflow_completed("R1", "action_required")).await;

    assert_eq!(stored_run(&store, &run_id).await.status, RunStatus::Failed);
}

#[actix_rt::test]
async fn test_replayed_delivery_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let mut payload = workflow_completed("R1", "failure");
    payload["steps"] = json!([
        {"name": "login", "conclusion": "success", "duration_ms": 812},
        {"name": "pay", "conclusion": "failure", "output": {"summary": "HTTP 500", "text": "Payment declined"}}
    ]);

    let (first, _) = post_signed(&app, &payload).await;
    let run_once = stored_run(&store, &run_id).await;
    let steps_once = stored_steps(&store, &run_id).await;

    let (second, body) = post_signed(&app, &payload).await;

    assert_eq!((first, second), (200, 200));
    assert!(body["outcome"]["status"].is_null());
    assert_eq!(stored_run(&store, &run_id).await, run_once);
    assert_eq!(stored_steps(&store, &run_id).await, steps_once);
    assert_eq!(steps_once.len(), 2);
}

#[actix_rt::test]
async fn test_late_in_progress_does_not_regress_status() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    post_signed(&app, &workflow_completed("R1", "success")).await;
    let (status, _) = post_signed(&app, &workflow_in_progress("R1")).await;

    assert_eq!(status, 200);
    let run = stored_run(&store, &run_id).await;
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.completed_at.is_some());
}

#[actix_rt::test]
async fn test_sparse_in_progress_keeps_commit_metadata() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    post_signed(&app, &workflow_completed("R1", "success")).await;
    let sparse = json!({
        "action": "in_progress",
        "workflow_run": {
            "status": "in_progress",
            "inputs": {"run_id": "R1"},
            "html_url": "https://github.com/acme/shop/actions/runs/1/attempts/2"
        }
    });
    let (status, _) = post_signed(&app, &sparse).await;

    assert_eq!(status, 200);
    let run = stored_run(&store, &run_id).await;
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.commit_sha.as_deref(), Some("abc123"));
    assert_eq!(run.commit_message.as_deref(), Some("Nightly checkout run"));
    assert_eq!(
        run.workflow_url.as_deref(),
        Some("https://github.com/acme/shop/actions/runs/1/attempts/2")
    );
}

#[actix_rt::test]
async fn test_in_progress_then_completed() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    post_signed(&app, &workflow_in_progress("R1")).await;
    let in_progress = stored_run(&store, &run_id).await;
    assert_eq!(in_progress.status, RunStatus::InProgress);
    assert!(in_progress.completed_at.is_none());

    post_signed(&app, &workflow_completed("R1", "cancelled")).await;
    let run = stored_run(&store, &run_id).await;
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.completed_at.is_some());
}

#[actix_rt::test]
async fn test_step_upsert_overwrites_single_record() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let mut first = workflow_in_progress("R1");
    first["steps"] = json!([{
        "name": "login",
        "status": "failed",
        "action": "Sign in as shopper",
        "expected": "Dashboard is shown",
        "error": "Timeout waiting for #dashboard",
        "screenshot": "https://cdn.example/login.png"
    }]);
    post_signed(&app, &first).await;

    let mut second = workflow_completed("R1", "success");
    second["steps"] = json!([{
        "name": "login",
        "conclusion": "success",
        "action": "ignored on update",
        "duration": 1530.6
    }]);
    post_signed(&app, &second).await;

    let steps = stored_steps(&store, &run_id).await;
    assert_eq!(steps.len(), 1);
    let login = &steps[0];
    assert_eq!(login.status, StepStatus::Passed);
    assert_eq!(login.action, "Sign in as shopper");
    assert_eq!(login.expected, "Dashboard is shown");
    assert_eq!(login.error, None);
    assert_eq!(login.screenshot, None);
    assert_eq!(login.duration_ms, Some(1531));
}

#[actix_rt::test]
async fn test_long_reporter_step_name_is_stored() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let name = format!("{} - {}", "checkout ".repeat(40), "pays with a saved card ".repeat(20));
    let mut payload = workflow_completed("R1", "success");
    payload["steps"] = json!([{"name": name, "conclusion": "success"}]);

    let (status, _) = post_signed(&app, &payload).await;

    assert_eq!(status, 200);
    let steps = stored_steps(&store, &run_id).await;
    assert_eq!(steps.len(), 1);
    assert!(steps[0].name.len() > 500);
    assert_eq!(steps[0].name, name);
}

#[actix_rt::test]
async fn test_results_artifact_is_preferred() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let mut payload = workflow_completed("R1", "success");
    payload["artifacts"] = json!([
        {"name": "trace", "archive_download_url": "https://ci.example/artifacts/1"},
        {"name": "test-results-chromium", "archive_download_url": "https://ci.example/artifacts/2"}
    ]);
    post_signed(&app, &payload).await;

    assert_eq!(
        stored_run(&store, &run_id).await.artifact_url.as_deref(),
        Some("https://ci.example/artifacts/2")
    );
}

#[actix_rt::test]
async fn test_commit_message_marker_correlates() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "run42").await;
    let app = create_test_app(store.clone()).await;

    let payload = json!({
        "action": "in_progress",
        "workflow_run": {
            "status": "in_progress",
            "head_commit": {"message": "TestHub dispatch run_id:run42"}
        }
    });
    let (status, body) = post_signed(&app, &payload).await;

    assert_eq!(status, 200);
    assert_eq!(body["outcome"]["run_id"], "run42");
    assert_eq!(stored_run(&store, &run_id).await.status, RunStatus::InProgress);
}

#[actix_rt::test]
async fn test_unknown_run_is_reported() {
    let store = Arc::new(MemoryStore::new());
    let app = create_test_app(store.clone()).await;

    let mut payload = workflow_completed("ghost", "success");
    payload["steps"] = json!([{"name": "login", "conclusion": "success"}]);
    let (status, body) = post_signed(&app, &payload).await;

    assert_eq!(status, 404);
    assert_eq!(body["error"], "NOT_FOUND");
    let ghost = testhub_lib::models::RunId::parse("ghost").unwrap();
    assert!(stored_steps(&store, &ghost).await.is_empty());
}

#[actix_rt::test]
async fn test_step_without_name_rejects_whole_delivery() {
    let store = Arc::new(MemoryStore::new());
    let run_id = seed_run(&store, "R1").await;
    let app = create_test_app(store.clone()).await;

    let mut payload = workflow_completed("R1", "success");
    payload["steps"] = json!([
        {"name": "login", "conclusion": "success"},
        {"conclusion": "failure"}
    ]);
    let (status, body) = post_signed(&app, &payload).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(stored_run(&store, &run_id).await.status, RunStatus::Pending);
    assert!(stored_steps(&store, &run_id).await.is_empty());
}
