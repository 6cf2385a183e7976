//! Map external CI status vocabularies onto run and step statuses.

use chrono::DateTime;

use crate::models::{RunStatus, StepStatus, WorkflowRun};

/// Map an external `(status, conclusion)` pair to a run status.
///
/// Unknown or missing conclusions on a completed run are treated as failures.
pub fn map_run_status(status: Option<&str>, conclusion: Option<&str>) -> RunStatus {
    match status {
        Some("completed") => match conclusion {
            Some("success") => RunStatus::Completed,
            Some("cancelled") => RunStatus::Cancelled,
            Some("timed_out") => RunStatus::Timeout,
            _ => RunStatus::Failed,
        },
        Some("in_progress") => RunStatus::InProgress,
        _ => RunStatus::Queued,
    }
}

/// Map a step or annotation conclusion to a step status.
pub fn map_step_status(conclusion: Option<&str>) -> StepStatus {
    match conclusion {
        Some("success") => StepStatus::Passed,
        Some("failure") => StepStatus::Failed,
        Some("skipped") => StepStatus::Skipped,
        _ => StepStatus::Pending,
    }
}

/// Step status for a reported step.
///
/// The CI reporter sends `status` already in our vocabulary and no
/// `conclusion`; GitHub sends a `conclusion`.
pub fn resolve_step_status(conclusion: Option<&str>, status: Option<&str>) -> StepStatus {
    match (conclusion, status.and_then(StepStatus::parse)) {
        (None, Some(reported)) => reported,
        _ => map_step_status(conclusion),
    }
}

/// Human-readable summary for a run that just moved to `status`.
pub fn summarize(status: RunStatus, run: &WorkflowRun) -> String {
    match status {
        RunStatus::Completed => "All test steps completed successfully.".to_string(),
        RunStatus::Failed => format!(
            "Test failed after {}s. Check the detailed steps below for specific failure points.",
            elapsed_seconds(run)
        ),
        RunStatus::Cancelled => "Test run was cancelled before completion.".to_string(),
        RunStatus::Timeout => {
            "Test run exceeded the maximum execution time and was terminated.".to_string()
        }
        RunStatus::InProgress => "Test run is in progress.".to_string(),
        RunStatus::Queued | RunStatus::Pending => {
            "Test run is queued and waiting for a runner.".to_string()
        }
    }
}

/// Whole seconds between `created_at` and `updated_at`; 0 when either is unusable.
fn elapsed_seconds(run: &WorkflowRun) -> i64 {
    let parse = |ts: Option<&String>| ts.and_then(|s| DateTime::parse_from_rfc3339(s).ok());

    match (parse(run.created_at.as_ref()), parse(run.updated_at.as_ref())) {
        (Some(created), Some(updated)) => {
            let millis = (updated - created).num_milliseconds();
            ((millis as f64) / 1000.0).round().max(0.0) as i64
        }
        _ => 0,
    }
}
