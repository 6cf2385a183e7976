//! Process-local run store.
//!
//! Backs the integration tests and database-less local runs. All state sits
//! behind one mutex that is never held across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::store::{Planner, RunStore, run_not_found};
use crate::error::{AppError, AppResult};
use crate::models::{Changeset, NewTestRun, RunId, RunUpdate, StepUpsert, TestRun, TestStep};

#[derive(Default)]
struct MemoryState {
    runs: HashMap<RunId, TestRun>,
    steps: BTreeMap<(RunId, String), TestStep>,
}

impl MemoryState {
    fn upsert_step(&mut self, run_id: &RunId, step: &StepUpsert) -> TestStep {
        let key = (run_id.clone(), step.name.clone());
        match self.steps.get_mut(&key) {
            Some(existing) => {
                existing.overwrite(step);
                existing.clone()
            }
            None => {
                let created = TestStep::create(Uuid::now_v7(), run_id.clone(), step);
                self.steps.insert(key, created.clone());
                created
            }
        }
    }
}

/// In-memory `RunStore` with optional injected latency and a call counter.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation, e.g. to exercise store timeouts.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Number of store operations performed so far (readiness probes excluded).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> MutexGuard<'_, MemoryState> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        // A panicking planner never leaves partial writes behind, so the data is intact.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn create_run(&self, run: NewTestRun) -> AppResult<TestRun> {
        let mut state = self.enter().await;
        if state.runs.contains_key(&run.id) {
            return Err(AppError::Validation(format!("Run {} already exists", run.id)));
        }
        let created = TestRun {
            id: run.id.clone(),
            name: run.name,
            project_id: run.project_id,
            status: run.status,
            environment: run.environment,
            started_at: run.started_at,
            completed_at: None,
            commit_sha: None,
            commit_message: None,
            workflow_url: None,
            artifact_url: None,
            summary: None,
        };
        state.runs.insert(run.id, created.clone());
        Ok(created)
    }

    async fn find_run(&self, run_id: &RunId) -> AppResult<Option<TestRun>> {
        let state = self.enter().await;
        Ok(state.runs.get(run_id).cloned())
    }

    async fn list_steps(&self, run_id: &RunId) -> AppResult<Vec<TestStep>> {
        let state = self.enter().await;
        Ok(state
            .steps
            .iter()
            .filter(|((id, _), _)| id == run_id)
            .map(|(_, step)| step.clone())
            .collect())
    }

    async fn update_run(&self, run_id: &RunId, update: &RunUpdate) -> AppResult<TestRun> {
        let mut state = self.enter().await;
        let run = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| run_not_found(run_id))?;
        run.apply(update);
        Ok(run.clone())
    }

    async fn upsert_step(&self, run_id: &RunId, step: &StepUpsert) -> AppResult<TestStep> {
        let mut state = self.enter().await;
        if !state.runs.contains_key(run_id) {
            return Err(run_not_found(run_id));
        }
        Ok(state.upsert_step(run_id, step))
    }

    async fn reconcile(&self, run_id: &RunId, planner: Planner<'_>) -> AppResult<Changeset> {
        let mut state = self.enter().await;
        let current = state
            .runs
            .get(run_id)
            .cloned()
            .ok_or_else(|| run_not_found(run_id))?;

        let changes = planner(&current);

        if let Some(run) = state.runs.get_mut(run_id) {
            run.apply(&changes.run);
        }
        for step in &changes.steps {
            state.upsert_step(run_id, step);
        }
        Ok(changes)
    }

    async fn ping(&self) -> AppResult<()> {
        // Not counted as a call, but as slow as any other round trip.
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}
