//! Domain models for the TestHub webhook server.

pub mod run;
pub mod step;
pub mod webhook;

// Re-export commonly used types
pub use run::{NewTestRun, RunId, RunMetadata, RunStatus, RunUpdate, TestRun};
pub use step::{StepStatus, StepUpsert, TestStep};
pub use webhook::{
    Annotation, ArtifactReport, CheckRunDelivery, EventKind, StepReport, WorkflowRun,
    WorkflowRunDelivery,
};

/// Every write one delivery makes, applied by the store as a single unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    pub run: RunUpdate,
    pub steps: Vec<StepUpsert>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.run.is_empty() && self.steps.is_empty()
    }
}
