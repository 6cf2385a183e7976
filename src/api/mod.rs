//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod runs;
pub mod webhooks;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use runs::configure_routes as configure_run_routes;
pub use webhooks::configure_routes as configure_webhook_routes;

use actix_web::web;

/// Register every `/api/v1` route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_webhook_routes)
        .configure(configure_run_routes);
}
