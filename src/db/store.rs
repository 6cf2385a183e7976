//! The persistence contract the webhook pipeline writes through.

use async_trait::async_trait;
use sea_orm::TransactionTrait;

use super::{DbPool, test_runs, test_steps};
use crate::error::{AppError, AppResult};
use crate::models::{Changeset, NewTestRun, RunId, RunUpdate, StepUpsert, TestRun, TestStep};

/// Pure function from the run as currently stored to the writes one delivery makes.
pub type Planner<'a> = &'a (dyn Fn(&TestRun) -> Changeset + Send + Sync);

/// Run and step persistence.
///
/// Every method is atomic per call and safe to repeat with identical arguments.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert a run handed over by the dispatcher.
    async fn create_run(&self, run: NewTestRun) -> AppResult<TestRun>;

    async fn find_run(&self, run_id: &RunId) -> AppResult<Option<TestRun>>;

    /// Steps of a run, ordered by name.
    async fn list_steps(&self, run_id: &RunId) -> AppResult<Vec<TestStep>>;

    /// Apply a partial update. `NotFound` if the run does not exist.
    async fn update_run(&self, run_id: &RunId, update: &RunUpdate) -> AppResult<TestRun>;

    /// Create or overwrite the step keyed by (run id, step name).
    /// `NotFound` if the run does not exist.
    async fn upsert_step(&self, run_id: &RunId, step: &StepUpsert) -> AppResult<TestStep>;

    /// Load the run exclusively, plan against it, and apply the plan as one unit.
    ///
    /// Returns `NotFound` before any write when the run does not exist.
    async fn reconcile(&self, run_id: &RunId, planner: Planner<'_>) -> AppResult<Changeset>;

    /// Readiness probe.
    async fn ping(&self) -> AppResult<()>;
}

pub(crate) fn run_not_found(run_id: &RunId) -> AppError {
    AppError::NotFound(format!("Run {}", run_id))
}

#[async_trait]
impl RunStore for DbPool {
    async fn create_run(&self, run: NewTestRun) -> AppResult<TestRun> {
        let model = test_runs::insert(self.connection(), &run).await?;
        test_runs::to_domain(model)
    }

    async fn find_run(&self, run_id: &RunId) -> AppResult<Option<TestRun>> {
        test_runs::find(self.connection(), run_id, false)
            .await?
            .map(test_runs::to_domain)
            .transpose()
    }

    async fn list_steps(&self, run_id: &RunId) -> AppResult<Vec<TestStep>> {
        test_steps::list_by_run(self.connection(), run_id)
            .await?
            .into_iter()
            .map(test_steps::to_domain)
            .collect()
    }

    async fn update_run(&self, run_id: &RunId, update: &RunUpdate) -> AppResult<TestRun> {
        let txn = self.connection().begin().await?;
        let model = test_runs::find(&txn, run_id, true)
            .await?
            .ok_or_else(|| run_not_found(run_id))?;
        let model = test_runs::apply_update(&txn, model, update).await?;
        txn.commit().await?;
        test_runs::to_domain(model)
    }

    async fn upsert_step(&self, run_id: &RunId, step: &StepUpsert) -> AppResult<TestStep> {
        let txn = self.connection().begin().await?;
        // Row lock on the parent keeps concurrent upserts of one run serialized.
        test_runs::find(&txn, run_id, true)
            .await?
            .ok_or_else(|| run_not_found(run_id))?;
        let model = test_steps::upsert(&txn, run_id, step).await?;
        txn.commit().await?;
        test_steps::to_domain(model)
    }

    async fn reconcile(&self, run_id: &RunId, planner: Planner<'_>) -> AppResult<Changeset> {
        let txn = self.connection().begin().await?;
        let model = test_runs::find(&txn, run_id, true)
            .await?
            .ok_or_else(|| run_not_found(run_id))?;
        let current = test_runs::to_domain(model.clone())?;

        let changes = planner(&current);

        if !changes.run.is_empty() {
            test_runs::apply_update(&txn, model, &changes.run).await?;
        }
        for step in &changes.steps {
            test_steps::upsert(&txn, run_id, step).await?;
        }

        // Dropping the transaction on any early return rolls it back.
        txn.commit().await?;
        Ok(changes)
    }

    async fn ping(&self) -> AppResult<()> {
        DbPool::ping(self).await
    }
}
