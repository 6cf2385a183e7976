//! Merge one correlated CI event into the stored run and its steps.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use super::run_locks::RunLocks;
use super::status_mapper::{map_run_status, map_step_status, resolve_step_status, summarize};
use crate::db::{RunStore, StoreTimeout};
use crate::error::AppResult;
use crate::models::{
    Annotation, ArtifactReport, Changeset, CheckRunDelivery, EventKind, RunId, RunMetadata,
    RunStatus, RunUpdate, StepReport, StepUpsert, TestRun, WorkflowRun, WorkflowRunDelivery,
};

const DEFAULT_EXPECTED: &str = "Step should complete successfully";
const ANNOTATION_EXPECTED: &str = "No errors";
const RESULTS_ARTIFACT_MARKER: &str = "test-results";

/// A classified, correlated delivery with its typed payload.
#[derive(Debug, Clone)]
pub enum ResolvedEvent {
    WorkflowRun {
        /// `WorkflowRunCompleted` or `WorkflowRunInProgress`.
        kind: EventKind,
        /// Run status mapped from the external status and conclusion.
        status: RunStatus,
        delivery: WorkflowRunDelivery,
    },
    CheckRun(CheckRunDelivery),
}

impl ResolvedEvent {
    /// Deserialize the typed view for `kind`. `None` for ignored shapes.
    pub fn from_payload(kind: EventKind, payload: JsonValue) -> AppResult<Option<Self>> {
        let event = match kind {
            EventKind::WorkflowRunCompleted | EventKind::WorkflowRunInProgress => {
                let delivery: WorkflowRunDelivery = serde_json::from_value(payload)?;
                let external = delivery
                    .workflow_run
                    .status
                    .as_deref()
                    .or(kind.implied_status());
                let status = map_run_status(external, delivery.workflow_run.conclusion.as_deref());
                Self::WorkflowRun {
                    kind,
                    status,
                    delivery,
                }
            }
            EventKind::CheckRun => Self::CheckRun(serde_json::from_value(payload)?),
            EventKind::Ignored => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Compute every write `event` makes against the run as currently stored.
///
/// Pure apart from logging; the same inputs always give the same changeset.
pub fn plan(current: &TestRun, event: &ResolvedEvent, now: DateTime<Utc>) -> Changeset {
    match event {
        ResolvedEvent::WorkflowRun {
            kind,
            status,
            delivery,
        } => {
            let mut run = RunUpdate::default();

            if current.status.can_advance_to(*status) {
                run.status = Some(*status);
                run.summary = Some(summarize(*status, &delivery.workflow_run));
                if status.is_terminal() {
                    run.completed_at = Some(now);
                }
            } else {
                info!(
                    run_id = %current.id,
                    current = %current.status,
                    reported = %status,
                    "Ignoring status that would move run backwards"
                );
            }

            let metadata = metadata(*kind, &delivery.workflow_run);
            run.metadata = (!metadata.is_empty()).then_some(metadata);
            run.artifact_url = delivery
                .artifacts
                .as_deref()
                .and_then(select_artifact)
                .and_then(|artifact| artifact.archive_download_url.clone());

            let steps = delivery
                .steps
                .iter()
                .flatten()
                .map(step_from_report)
                .collect();

            Changeset { run, steps }
        }
        ResolvedEvent::CheckRun(delivery) => {
            let steps = delivery
                .check_run
                .output
                .as_ref()
                .and_then(|output| output.annotations.as_ref())
                .into_iter()
                .flatten()
                .enumerate()
                .map(|(index, annotation)| step_from_annotation(index, annotation))
                .collect();

            Changeset {
                run: RunUpdate::default(),
                steps,
            }
        }
    }
}

/// Progress deliveries only refresh the workflow link; commit data comes
/// from completions. Absent fields are left as stored.
fn metadata(kind: EventKind, run: &WorkflowRun) -> RunMetadata {
    if kind == EventKind::WorkflowRunInProgress {
        return RunMetadata {
            workflow_url: run.html_url.clone(),
            ..Default::default()
        };
    }

    RunMetadata {
        commit_sha: run.head_sha.clone(),
        commit_message: run
            .head_commit
            .as_ref()
            .and_then(|commit| commit.message.clone()),
        workflow_url: run.html_url.clone(),
    }
}

/// The test results archive if one is listed, otherwise the first artifact.
fn select_artifact(artifacts: &[ArtifactReport]) -> Option<&ArtifactReport> {
    artifacts
        .iter()
        .find(|artifact| {
            artifact
                .name
                .as_deref()
                .is_some_and(|name| name.contains(RESULTS_ARTIFACT_MARKER))
        })
        .or_else(|| artifacts.first())
}

fn step_from_report(report: &StepReport) -> StepUpsert {
    let output = report.output.as_ref();

    StepUpsert {
        name: report.name.clone(),
        status: resolve_step_status(report.conclusion.as_deref(), report.status.as_deref()),
        action: report.action.clone().unwrap_or_else(|| report.name.clone()),
        expected: report
            .expected
            .clone()
            .unwrap_or_else(|| DEFAULT_EXPECTED.to_string()),
        actual: output
            .and_then(|o| o.summary.clone())
            .or_else(|| report.actual.clone()),
        error: output
            .and_then(|o| o.text.clone())
            .or_else(|| report.error.clone()),
        duration_ms: report
            .duration_ms
            .or(report.duration)
            .map(|ms| ms.round() as i64),
        artifact_url: report.artifact_url.clone(),
        screenshot: report
            .screenshot_url
            .clone()
            .or_else(|| report.screenshot.clone()),
    }
}

fn step_from_annotation(index: usize, annotation: &Annotation) -> StepUpsert {
    let name = annotation
        .title
        .clone()
        .or_else(|| annotation.start_line.map(|line| format!("Line {}", line)))
        .unwrap_or_else(|| format!("Annotation {}", index));

    StepUpsert {
        action: name.clone(),
        name,
        status: map_step_status(annotation.annotation_level.as_deref()),
        expected: ANNOTATION_EXPECTED.to_string(),
        actual: annotation.raw_details.clone(),
        error: annotation.message.clone(),
        duration_ms: None,
        artifact_url: None,
        screenshot: None,
    }
}

/// Applies resolved events through a `RunStore`, one run at a time.
pub struct Reconciler {
    store: Arc<dyn RunStore>,
    locks: RunLocks,
    store_timeout: StoreTimeout,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RunStore>, store_timeout: Duration) -> Self {
        Self {
            store,
            locks: RunLocks::new(),
            store_timeout: StoreTimeout(store_timeout),
        }
    }

    /// Apply `event` to `run_id` as a single unit and return what was written.
    ///
    /// The lock wait and the store call share one deadline; expiry is a
    /// `TransientStore` error and leaves nothing applied.
    pub async fn apply(&self, run_id: &RunId, event: &ResolvedEvent) -> AppResult<Changeset> {
        let now = Utc::now();
        let planner = |current: &TestRun| plan(current, event, now);

        let subject = format!("run {}", run_id);
        self.store_timeout
            .bound(&subject, async {
                let _guard = self.locks.acquire(run_id).await;
                self.store.reconcile(run_id, &planner).await
            })
            .await
    }
}
