//! Inbound CI webhook payloads.
//!
//! Every field is optional unless the pipeline cannot work without it; the
//! senders (GitHub Actions and the TestHub CI reporter) fill these in unevenly.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Payload shape, decided from the top-level keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// `{action: "completed", workflow_run: {...}}`
    WorkflowRunCompleted,
    /// `{action: "in_progress", workflow_run: {...}}`
    WorkflowRunInProgress,
    /// `{check_run: {...}}`
    CheckRun,
    /// Anything else; acknowledged and dropped.
    Ignored,
}

impl EventKind {
    /// Classify a parsed payload. Total: unknown shapes are `Ignored`.
    pub fn classify(payload: &JsonValue) -> Self {
        let action = payload.get("action").and_then(JsonValue::as_str);
        let has_workflow_run = payload.get("workflow_run").is_some_and(JsonValue::is_object);

        match action {
            Some("completed") if has_workflow_run => Self::WorkflowRunCompleted,
            Some("in_progress") if has_workflow_run => Self::WorkflowRunInProgress,
            _ if payload.get("check_run").is_some_and(JsonValue::is_object) => Self::CheckRun,
            _ => Self::Ignored,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowRunCompleted => "workflow_run.completed",
            Self::WorkflowRunInProgress => "workflow_run.in_progress",
            Self::CheckRun => "check_run",
            Self::Ignored => "ignored",
        }
    }

    /// The `action` value that stands in for a missing `workflow_run.status`.
    pub fn implied_status(&self) -> Option<&'static str> {
        match self {
            Self::WorkflowRunCompleted => Some("completed"),
            Self::WorkflowRunInProgress => Some("in_progress"),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `workflow_run` delivery, including the TestHub reporter's extra lists.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowRunDelivery {
    pub workflow_run: WorkflowRun,
    #[serde(default)]
    pub steps: Option<Vec<StepReport>>,
    #[serde(default)]
    pub artifacts: Option<Vec<ArtifactReport>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowRun {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
    #[serde(default)]
    pub html_url: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: Option<String>,
}

/// One reported step. `name` is the idempotency key and is required.
#[derive(Debug, Clone, Deserialize)]
pub struct StepReport {
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Reporter-side status, already in the step vocabulary.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub expected: Option<String>,
    #[serde(default)]
    pub output: Option<StepOutput>,
    #[serde(default)]
    pub actual: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub artifact_url: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepOutput {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactReport {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub archive_download_url: Option<String>,
}

/// `check_run` delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunDelivery {
    pub check_run: CheckRun,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRun {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub output: Option<CheckRunOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRunOutput {
    #[serde(default)]
    pub annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_line: Option<i64>,
    #[serde(default)]
    pub annotation_level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub raw_details: Option<String>,
}
