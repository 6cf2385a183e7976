//! Resolve a CI callback to the run it reports on.
//!
//! Strategies are tried in order and the first hit wins. Each one is total:
//! a missing or oddly-typed field is "no match", never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::models::RunId;

/// Marker the dispatcher asks CI to embed in the commit message.
///
/// Matches anywhere in the message, so unrelated text of the same form is
/// picked up too.
static COMMIT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"run_id:(\w+)").expect("commit marker pattern is valid")
});

pub type Strategy = fn(&JsonValue) -> Option<RunId>;

/// Named correlation strategies in priority order.
pub const STRATEGIES: [(&'static str, Strategy); 3] = [
    ("workflow_input", from_workflow_input),
    ("commit_marker", from_commit_message),
    ("check_run_external_id", from_check_run_external_id),
];

/// Result of a successful correlation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub run_id: RunId,
    /// Name of the strategy that matched.
    pub strategy: &'static str,
}

/// Try every strategy in order.
pub fn correlate(payload: &JsonValue) -> Option<Correlation> {
    STRATEGIES.iter().find_map(|&(name, strategy)| {
        strategy(payload).map(|run_id| Correlation {
            run_id,
            strategy: name,
        })
    })
}

/// `workflow_run.inputs.run_id`, echoed back from the dispatch request.
fn from_workflow_input(payload: &JsonValue) -> Option<RunId> {
    match payload.pointer("/workflow_run/inputs/run_id")? {
        JsonValue::String(s) => RunId::parse(s),
        JsonValue::Number(n) => RunId::parse(&n.to_string()),
        _ => None,
    }
}

/// `run_id:<token>` inside `workflow_run.head_commit.message`.
fn from_commit_message(payload: &JsonValue) -> Option<RunId> {
    let message = payload
        .pointer("/workflow_run/head_commit/message")?
        .as_str()?;
    let captures = COMMIT_MARKER.captures(message)?;
    RunId::parse(captures.get(1)?.as_str())
}

fn from_check_run_external_id(payload: &JsonValue) -> Option<RunId> {
    payload
        .pointer("/check_run/external_id")?
        .as_str()
        .and_then(RunId::parse)
}
