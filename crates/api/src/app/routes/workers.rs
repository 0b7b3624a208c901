use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use jobtrack_core::WorkerId;
use jobtrack_infra::JobService;
use jobtrack_jobs::CreateWorker;

use crate::app::routes::query_pairs;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_workers).post(create_worker))
        .route("/bulk", post(bulk_create_workers))
        .route("/:id", get(get_worker).delete(delete_worker))
}

pub async fn create_worker(
    Extension(service): Extension<Arc<JobService>>,
    body: Result<Json<dto::CreateWorkerRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match service.create_worker(body.into()).await {
        Ok(worker) => (StatusCode::CREATED, Json(dto::worker_to_json(worker))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// All-or-nothing insert of an array of workers.
pub async fn bulk_create_workers(
    Extension(service): Extension<Arc<JobService>>,
    body: Result<Json<Vec<dto::CreateWorkerRequest>>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let inputs = body.into_iter().map(CreateWorker::from).collect();
    match service.bulk_create_workers(inputs).await {
        Ok(workers) => (StatusCode::CREATED, Json(dto::workers_to_json(workers))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_workers(
    Extension(service): Extension<Arc<JobService>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> axum::response::Response {
    let Query(params) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };

    match service.list_workers(query_pairs(&params)).await {
        Ok(page) => (StatusCode::OK, Json(dto::worker_page_to_json(page))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_worker(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<WorkerId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.get_worker(id).await {
        Ok(worker) => (StatusCode::OK, Json(dto::worker_to_json(worker))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_worker(
    Extension(service): Extension<Arc<JobService>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match errors::parse_id::<WorkerId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match service.delete_worker(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
