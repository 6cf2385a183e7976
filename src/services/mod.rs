//! Webhook ingestion pipeline.

pub mod correlator;
pub mod event_router;
pub mod reconciler;
pub mod run_locks;
pub mod status_mapper;

pub use correlator::{Correlation, correlate};
pub use event_router::{Delivery, DeliveryOutcome, EventRouter};
pub use reconciler::{Reconciler, ResolvedEvent};
pub use run_locks::RunLocks;
