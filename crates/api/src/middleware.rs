use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tag every request with an id, run it inside a span carrying that id and
/// echo the id back in the `x-request-id` response header.
///
/// A well-formed id supplied by the caller is kept; otherwise a UUIDv7 is
/// generated.
pub async fn request_context(req: Request, next: Next) -> Response {
    let request_id = extract_request_id(req.headers()).unwrap_or_else(|| Uuid::now_v7().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > 128 {
        return None;
    }
    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_supplied_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(" abc-123 "));
        assert_eq!(extract_request_id(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn blank_or_oversized_ids_are_replaced() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_request_id(&headers), None);

        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("   "));
        assert_eq!(extract_request_id(&headers), None);

        let long = "x".repeat(200);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_eq!(extract_request_id(&headers), None);
    }
}
