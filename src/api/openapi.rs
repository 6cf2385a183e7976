//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TestHub Webhook Server",
        version = "0.1.0",
        description = "Ingests signed CI callbacks and reconciles them into test runs and steps"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Webhook endpoints
        api::webhooks::receive_github_webhook,
        // Run endpoints
        api::runs::get_run,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Webhooks
            api::webhooks::WebhookAck,
            services::DeliveryOutcome,
            // Runs
            models::RunStatus,
            models::StepStatus,
            models::TestRun,
            models::TestStep,
            api::runs::RunDetailResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Webhooks", description = "Signed CI event ingestion"),
        (name = "Runs", description = "Reconciled run state")
    ),
    modifiers(&SignatureAddon)
)]
pub struct ApiDoc;

/// Document the webhook signature header as a security scheme.
struct SignatureAddon;

impl utoipa::Modify for SignatureAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "webhook_signature",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::with_description(
                            "X-Hub-Signature-256",
                            "sha256=<hex HMAC-SHA256 of the raw body>",
                        ),
                    ),
                ),
            );
        }
    }
}
