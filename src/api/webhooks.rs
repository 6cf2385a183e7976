//! CI webhook endpoint.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::{ALT_SIGNATURE_HEADER, DELIVERY_HEADER, SIGNATURE_HEADER};
use crate::error::AppResult;
use crate::services::{Delivery, DeliveryOutcome, EventRouter};

/// Acknowledgement returned for every accepted delivery.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub success: bool,
    pub outcome: DeliveryOutcome,
}

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Receive a GitHub Actions (or CI reporter) delivery.
///
/// The body is taken as raw bytes so the signature is checked against exactly
/// what the sender signed.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/github",
    tag = "Webhooks",
    request_body(content = String, description = "Raw JSON event payload", content_type = "application/json"),
    params(
        ("X-Signature" = Option<String>, Header, description = "Reporter signature; checked first"),
        ("X-Hub-Signature-256" = Option<String>, Header, description = "sha256=<hex HMAC of the body>"),
        ("X-GitHub-Delivery" = Option<String>, Header, description = "Sender delivery id"),
    ),
    responses(
        (status = 200, description = "Delivery accepted", body = WebhookAck),
        (status = 400, description = "Malformed payload", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid signature", body = crate::error::ErrorResponse),
        (status = 404, description = "Correlated run does not exist", body = crate::error::ErrorResponse),
        (status = 500, description = "Processing failed", body = crate::error::ErrorResponse),
        (status = 503, description = "Store unavailable, retry later", body = crate::error::ErrorResponse),
    )
)]
pub async fn receive_github_webhook(
    req: HttpRequest,
    body: web::Bytes,
    router: web::Data<EventRouter>,
) -> AppResult<HttpResponse> {
    let delivery = Delivery {
        body: body.to_vec(),
        signature: header(&req, ALT_SIGNATURE_HEADER).or_else(|| header(&req, SIGNATURE_HEADER)),
        delivery_id: header(&req, DELIVERY_HEADER),
    };

    let outcome = router.handle(&delivery).await?;

    Ok(HttpResponse::Ok().json(WebhookAck {
        success: true,
        outcome,
    }))
}

/// Configure webhook routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/webhooks/github").route(web::post().to(receive_github_webhook)));
}
