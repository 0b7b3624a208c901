use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jobtrack_core::DomainError;
use jobtrack_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let (status, code) = match err.root() {
        ServiceError::Domain(DomainError::Validation(_)) => (StatusCode::BAD_REQUEST, "validation_error"),
        ServiceError::Domain(DomainError::InvalidQuery(_)) => (StatusCode::BAD_REQUEST, "invalid_query"),
        ServiceError::Domain(DomainError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
        ServiceError::Store(_) | ServiceError::BulkEntry { .. } => {
            tracing::error!(error = %err, "store failure");
            return json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "internal storage error",
            );
        }
    };

    tracing::debug!(code, error = %err, "request rejected");
    json_error(status, code, err.to_string())
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path id such as `JobId` or `WorkerId`.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))
}
