use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use jobtrack_infra::JobService;

use crate::app::{dto, errors};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Grouped counts over every job and worker, ignoring any list filters.
pub async fn stats(Extension(service): Extension<Arc<JobService>>) -> axum::response::Response {
    match service.stats().await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(stats))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
