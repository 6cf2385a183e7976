//! Entry point for one webhook delivery.
//!
//! Verify, parse, classify, correlate, reconcile. Nothing is parsed before the
//! signature checks out, and nothing after that point can take the process down.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::correlator::correlate;
use super::reconciler::{Reconciler, ResolvedEvent};
use crate::auth::{WebhookSecret, verify_signature};
use crate::db::RunStore;
use crate::error::{AppError, AppResult};
use crate::models::{EventKind, RunId, RunStatus};

/// One inbound delivery as received on the wire.
#[derive(Debug, Clone, Default)]
pub struct Delivery {
    /// Exact request body bytes; the signature is computed over these.
    pub body: Vec<u8>,
    pub signature: Option<String>,
    /// Sender-assigned delivery id, for log correlation only.
    pub delivery_id: Option<String>,
}

/// What a successfully handled delivery did.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Reconciled into a run.
    Applied {
        #[schema(value_type = String)]
        run_id: RunId,
        /// Status written by this delivery; absent when the run kept its status.
        status: Option<RunStatus>,
        /// Number of steps created or updated.
        steps: usize,
    },
    /// Recognized shape that names no dispatched run.
    Uncorrelated,
    /// Shape this pipeline does not handle.
    Ignored,
}

/// Sequences the webhook pipeline for each delivery.
pub struct EventRouter {
    secret: Option<WebhookSecret>,
    reconciler: Reconciler,
}

impl EventRouter {
    /// `secret` of `None` rejects every delivery.
    pub fn new(
        secret: Option<WebhookSecret>,
        store: Arc<dyn RunStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            secret,
            reconciler: Reconciler::new(store, store_timeout),
        }
    }

    pub async fn handle(&self, delivery: &Delivery) -> AppResult<DeliveryOutcome> {
        let delivery_id = delivery.delivery_id.as_deref().unwrap_or("-");

        if let Err(e) = verify_signature(
            self.secret.as_ref(),
            delivery.signature.as_deref(),
            &delivery.body,
        ) {
            warn!(target: "webhook", delivery_id, "Rejected delivery: {}", e);
            return Err(e);
        }

        match AssertUnwindSafe(self.process(delivery_id, &delivery.body))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic_detail(&*panic);
                error!(target: "webhook", delivery_id, "Delivery processing panicked: {}", detail);
                Err(AppError::Internal(format!(
                    "Delivery processing panicked: {}",
                    detail
                )))
            }
        }
    }

    async fn process(&self, delivery_id: &str, body: &[u8]) -> AppResult<DeliveryOutcome> {
        let payload: JsonValue = serde_json::from_slice(body)?;
        if !payload.is_object() {
            return Err(AppError::Validation(
                "Webhook payload must be a JSON object".to_string(),
            ));
        }

        let kind = EventKind::classify(&payload);
        if kind == EventKind::Ignored {
            info!(target: "webhook", delivery_id, "Ignoring unrecognized event");
            return Ok(DeliveryOutcome::Ignored);
        }

        let Some(correlation) = correlate(&payload) else {
            info!(target: "webhook", delivery_id, event = %kind, "No run id in event, dropping");
            return Ok(DeliveryOutcome::Uncorrelated);
        };
        let run_id = correlation.run_id;

        let Some(event) = ResolvedEvent::from_payload(kind, payload)? else {
            return Ok(DeliveryOutcome::Ignored);
        };

        match self.reconciler.apply(&run_id, &event).await {
            Ok(changes) => {
                info!(
                    target: "webhook",
                    delivery_id,
                    run_id = %run_id,
                    event = %kind,
                    strategy = correlation.strategy,
                    status = ?changes.run.status,
                    steps = changes.steps.len(),
                    "Applied delivery"
                );
                Ok(DeliveryOutcome::Applied {
                    run_id,
                    status: changes.run.status,
                    steps: changes.steps.len(),
                })
            }
            Err(e) => {
                match &e {
                    AppError::NotFound(_) => {
                        warn!(target: "webhook", delivery_id, run_id = %run_id, "Delivery for unknown run: {}", e)
                    }
                    _ => {
                        error!(target: "webhook", delivery_id, run_id = %run_id, "Failed to apply delivery: {}", e)
                    }
                }
                Err(e)
            }
        }
    }
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
