//! Database queries for test runs.

use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set};

use crate::entity::test_run::{self, ActiveModel, Entity as TestRunEntity};
use crate::error::{AppError, AppResult};
use crate::models::{NewTestRun, RunId, RunStatus, RunUpdate, TestRun};

/// Convert a row into the domain model.
pub fn to_domain(model: test_run::Model) -> AppResult<TestRun> {
    let status = RunStatus::parse(&model.status).ok_or_else(|| {
        AppError::Database(format!(
            "Run {} has unknown status '{}'",
            model.id, model.status
        ))
    })?;
    let id = RunId::parse(&model.id)
        .ok_or_else(|| AppError::Database("Run with blank id".to_string()))?;

    Ok(TestRun {
        id,
        name: model.name,
        project_id: model.project_id,
        status,
        environment: model.environment,
        started_at: model.started_at,
        completed_at: model.completed_at,
        commit_sha: model.commit_sha,
        commit_message: model.commit_message,
        workflow_url: model.workflow_url,
        artifact_url: model.artifact_url,
        summary: model.summary,
    })
}

/// Insert a dispatched run.
pub async fn insert<C: ConnectionTrait>(conn: &C, run: &NewTestRun) -> AppResult<test_run::Model> {
    let model = ActiveModel {
        id: Set(run.id.as_str().to_string()),
        name: Set(run.name.clone()),
        project_id: Set(run.project_id.clone()),
        status: Set(run.status.as_str().to_string()),
        environment: Set(run.environment.clone()),
        started_at: Set(run.started_at),
        completed_at: Set(None),
        commit_sha: Set(None),
        commit_message: Set(None),
        workflow_url: Set(None),
        artifact_url: Set(None),
        summary: Set(None),
    };

    model
        .insert(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert run: {}", e)))
}

/// Find a run by id, optionally taking a row lock (`FOR UPDATE`).
pub async fn find<C: ConnectionTrait>(
    conn: &C,
    run_id: &RunId,
    lock: bool,
) -> AppResult<Option<test_run::Model>> {
    let mut query = TestRunEntity::find_by_id(run_id.as_str().to_string());
    if lock {
        query = query.lock_exclusive();
    }
    Ok(query.one(conn).await?)
}

/// Write the populated fields of `update` onto an existing row.
pub async fn apply_update<C: ConnectionTrait>(
    conn: &C,
    model: test_run::Model,
    update: &RunUpdate,
) -> AppResult<test_run::Model> {
    let mut active: ActiveModel = model.clone().into();

    if let Some(status) = update.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(completed_at) = update.completed_at {
        active.completed_at = Set(Some(completed_at));
    }
    if let Some(ref summary) = update.summary {
        active.summary = Set(Some(summary.clone()));
    }
    if let Some(ref metadata) = update.metadata {
        if let Some(ref sha) = metadata.commit_sha {
            active.commit_sha = Set(Some(sha.clone()));
        }
        if let Some(ref message) = metadata.commit_message {
            active.commit_message = Set(Some(message.clone()));
        }
        if let Some(ref url) = metadata.workflow_url {
            active.workflow_url = Set(Some(url.clone()));
        }
    }
    if let Some(ref artifact_url) = update.artifact_url {
        active.artifact_url = Set(Some(artifact_url.clone()));
    }

    if !active.is_changed() {
        return Ok(model);
    }

    // Keep the DbErr classification so connection loss stays retryable.
    Ok(active.update(conn).await?)
}
