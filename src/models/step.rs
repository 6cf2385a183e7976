//! Test step domain models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RunId;

/// Observed outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
    Pending,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted step record, unique per (run id, name).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TestStep {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub run_id: RunId,
    pub name: String,
    pub status: StepStatus,
    pub action: String,
    pub expected: String,
    pub actual: Option<String>,
    pub error: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<i64>,
    pub artifact_url: Option<String>,
    pub screenshot: Option<String>,
}

/// Idempotent step write keyed by (run id, name).
///
/// `action` and `expected` are only used when the step is created.
#[derive(Debug, Clone, PartialEq)]
pub struct StepUpsert {
    pub name: String,
    pub status: StepStatus,
    pub action: String,
    pub expected: String,
    pub actual: Option<String>,
    pub error: Option<String>,
    pub duration_ms: Option<i64>,
    pub artifact_url: Option<String>,
    pub screenshot: Option<String>,
}

impl TestStep {
    /// Build a new record for a step seen for the first time.
    pub fn create(id: Uuid, run_id: RunId, upsert: &StepUpsert) -> Self {
        Self {
            id,
            run_id,
            name: upsert.name.clone(),
            status: upsert.status,
            action: upsert.action.clone(),
            expected: upsert.expected.clone(),
            actual: upsert.actual.clone(),
            error: upsert.error.clone(),
            duration_ms: upsert.duration_ms,
            artifact_url: upsert.artifact_url.clone(),
            screenshot: upsert.screenshot.clone(),
        }
    }

    /// Overwrite the observation fields from a later delivery.
    pub fn overwrite(&mut self, upsert: &StepUpsert) {
        self.status = upsert.status;
        self.actual = upsert.actual.clone();
        self.error = upsert.error.clone();
        self.duration_ms = upsert.duration_ms;
        self.artifact_url = upsert.artifact_url.clone();
        self.screenshot = upsert.screenshot.clone();
    }
}
