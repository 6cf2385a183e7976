//! Test run domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Opaque run identifier generated at dispatch time.
///
/// This is the correlation key CI callbacks are resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Wrap a raw id, rejecting blank values.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run lifecycle status.
///
/// `pending → queued → in_progress → {completed, failed, cancelled, timeout}`.
/// Terminal states never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created by the dispatcher, not yet handed to CI.
    Pending,
    /// Accepted by CI, waiting for a runner.
    Queued,
    /// Executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with a failure (or an unknown conclusion).
    Failed,
    /// Cancelled before completion.
    Cancelled,
    /// Exceeded the CI execution time limit.
    Timeout,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "queued" => Some(Self::Queued),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout
        )
    }

    /// Position in the lifecycle; all terminal states share the last stage.
    pub fn stage(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Queued => 1,
            Self::InProgress => 2,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout => 3,
        }
    }

    /// Whether a run currently in `self` may be moved to `next`.
    ///
    /// Same-stage moves are allowed for non-terminal states so replays are no-ops.
    pub fn can_advance_to(&self, next: RunStatus) -> bool {
        !self.is_terminal() && next.stage() >= self.stage()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted test run.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TestRun {
    #[schema(value_type = String)]
    pub id: RunId,
    pub name: String,
    /// Owning project; immutable after dispatch.
    pub project_id: String,
    pub status: RunStatus,
    pub environment: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set exactly when `status` is terminal.
    pub completed_at: Option<DateTime<Utc>>,
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub workflow_url: Option<String>,
    pub artifact_url: Option<String>,
    pub summary: Option<String>,
}

/// Run as handed over by the dispatcher.
#[derive(Debug, Clone)]
pub struct NewTestRun {
    pub id: RunId,
    pub name: String,
    pub project_id: String,
    pub status: RunStatus,
    pub environment: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl NewTestRun {
    /// A freshly dispatched run in `pending` state.
    pub fn pending(id: RunId, name: &str, project_id: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            project_id: project_id.to_string(),
            status: RunStatus::Pending,
            environment: None,
            started_at: Utc::now(),
        }
    }
}

/// CI metadata carried by workflow-run deliveries.
///
/// Each field overwrites its column when present; `None` leaves the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunMetadata {
    pub commit_sha: Option<String>,
    pub commit_message: Option<String>,
    pub workflow_url: Option<String>,
}

impl RunMetadata {
    pub fn is_empty(&self) -> bool {
        self.commit_sha.is_none() && self.commit_message.is_none() && self.workflow_url.is_none()
    }
}

/// Partial run update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunUpdate {
    pub status: Option<RunStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub metadata: Option<RunMetadata>,
    pub artifact_url: Option<String>,
}

impl RunUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.completed_at.is_none()
            && self.summary.is_none()
            && self.metadata.is_none()
            && self.artifact_url.is_none()
    }
}

impl TestRun {
    /// Apply an update in place; shared by every store implementation.
    pub fn apply(&mut self, update: &RunUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(completed_at) = update.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(ref summary) = update.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(ref metadata) = update.metadata {
            if let Some(ref sha) = metadata.commit_sha {
                self.commit_sha = Some(sha.clone());
            }
            if let Some(ref message) = metadata.commit_message {
                self.commit_message = Some(message.clone());
            }
            if let Some(ref url) = metadata.workflow_url {
                self.workflow_url = Some(url.clone());
            }
        }
        if let Some(ref artifact_url) = update.artifact_url {
            self.artifact_url = Some(artifact_url.clone());
        }
    }
}
