//! Run read endpoints for the dashboard.

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::{RunStore, StoreTimeout};
use crate::error::{AppError, AppResult};
use crate::models::{RunId, TestRun, TestStep};

/// A run with its steps.
#[derive(Debug, Serialize, ToSchema)]
pub struct RunDetailResponse {
    pub run: TestRun,
    /// Ordered by step name.
    pub steps: Vec<TestStep>,
}

/// Get a run and its steps.
#[utoipa::path(
    get,
    path = "/api/v1/runs/{run_id}",
    tag = "Runs",
    params(
        ("run_id" = String, Path, description = "Run id assigned at dispatch")
    ),
    responses(
        (status = 200, description = "Run details", body = RunDetailResponse),
        (status = 404, description = "Run not found", body = crate::error::ErrorResponse),
        (status = 503, description = "Store unavailable", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_run(
    store: web::Data<Arc<dyn RunStore>>,
    store_timeout: web::Data<StoreTimeout>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let raw = path.into_inner();
    let run_id = RunId::parse(&raw)
        .ok_or_else(|| AppError::Validation("run_id must not be blank".to_string()))?;

    let subject = format!("run {}", run_id);
    let (run, steps) = store_timeout
        .bound(&subject, async {
            let run = store.find_run(&run_id).await?;
            let steps = store.list_steps(&run_id).await?;
            Ok((run, steps))
        })
        .await?;
    let run = run.ok_or_else(|| AppError::NotFound(format!("Run {}", run_id)))?;

    Ok(HttpResponse::Ok().json(RunDetailResponse { run, steps }))
}

/// Configure run routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/runs/{run_id}").route(web::get().to(get_run)));
}
