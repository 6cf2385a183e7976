//! Database queries for test steps.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::test_step::{self, ActiveModel, Entity as TestStepEntity};
use crate::error::{AppError, AppResult};
use crate::models::{RunId, StepStatus, StepUpsert, TestStep};

/// Convert a row into the domain model.
pub fn to_domain(model: test_step::Model) -> AppResult<TestStep> {
    let status = StepStatus::parse(&model.status).ok_or_else(|| {
        AppError::Database(format!(
            "Step {} has unknown status '{}'",
            model.id, model.status
        ))
    })?;
    let run_id = RunId::parse(&model.test_run_id)
        .ok_or_else(|| AppError::Database(format!("Step {} has blank run id", model.id)))?;

    Ok(TestStep {
        id: model.id,
        run_id,
        name: model.name,
        status,
        action: model.action,
        expected: model.expected,
        actual: model.actual,
        error: model.error,
        duration_ms: model.duration_ms,
        artifact_url: model.artifact_url,
        screenshot: model.screenshot,
    })
}

/// All steps of a run, ordered by name.
pub async fn list_by_run<C: ConnectionTrait>(
    conn: &C,
    run_id: &RunId,
) -> AppResult<Vec<test_step::Model>> {
    Ok(TestStepEntity::find()
        .filter(test_step::Column::TestRunId.eq(run_id.as_str()))
        .order_by_asc(test_step::Column::Name)
        .all(conn)
        .await?)
}

/// Create or overwrite the step keyed by (run id, name).
///
/// Callers hold the parent run's row lock, so find-then-write cannot race.
pub async fn upsert<C: ConnectionTrait>(
    conn: &C,
    run_id: &RunId,
    step: &StepUpsert,
) -> AppResult<test_step::Model> {
    let existing = TestStepEntity::find()
        .filter(test_step::Column::TestRunId.eq(run_id.as_str()))
        .filter(test_step::Column::Name.eq(step.name.as_str()))
        .one(conn)
        .await?;

    match existing {
        Some(model) => {
            let mut active: ActiveModel = model.clone().into();
            active.status = Set(step.status.as_str().to_string());
            active.actual = Set(step.actual.clone());
            active.error = Set(step.error.clone());
            active.duration_ms = Set(step.duration_ms);
            active.artifact_url = Set(step.artifact_url.clone());
            active.screenshot = Set(step.screenshot.clone());

            if !active.is_changed() {
                return Ok(model);
            }
            Ok(active.update(conn).await?)
        }
        None => {
            let model = ActiveModel {
                id: Set(Uuid::now_v7()),
                test_run_id: Set(run_id.as_str().to_string()),
                name: Set(step.name.clone()),
                status: Set(step.status.as_str().to_string()),
                action: Set(step.action.clone()),
                expected: Set(step.expected.clone()),
                actual: Set(step.actual.clone()),
                error: Set(step.error.clone()),
                duration_ms: Set(step.duration_ms),
                artifact_url: Set(step.artifact_url.clone()),
                screenshot: Set(step.screenshot.clone()),
            };
            Ok(model.insert(conn).await?)
        }
    }
}
