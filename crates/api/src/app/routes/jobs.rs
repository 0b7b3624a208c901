use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use jobtrack_core::JobId;
use jobtrack_infra::JobService;

use crate::app::routes::query_pairs;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/:id", get(get_job).delete(delete_job))
        .route("/:id/workers", get(job_workers))
}

pub async fn create_job(
    Extension(service): Extension<Arc<JobService>>,
    body: Result<Json<dto::CreateJobRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match service.create_job(body.into()).await {
        Ok(summary) => (StatusCode::CREATED, Json(dto::job_to_json(summary))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(service): Extension<Arc<JobService>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };

    match service.list_jobs(query_pairs(&params)).await {
        Ok(page) => (StatusCode::OK, Json(dto::job_page_to_json(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<JobId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.get_job(id).await {
        Ok(summary) => (StatusCode::OK, Json(dto::job_to_json(summary))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_job(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<JobId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.delete_job(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn job_workers(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<JobId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.job_workers(id).await {
        Ok(workers) => (StatusCode::OK, Json(dto::workers_to_json(workers))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
