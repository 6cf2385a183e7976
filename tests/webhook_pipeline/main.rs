//! Webhook pipeline integration tests.
//!
//! Drives the real actix app end to end over an in-memory run store, so no
//! database is required.
//!
//! Run with: cargo test --test webhook_pipeline

mod test_helpers;

mod test_routing;
mod test_signature;
mod test_workflow_run;
