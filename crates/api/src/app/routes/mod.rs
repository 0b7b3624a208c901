use axum::{Router, routing::get};

pub mod jobs;
pub mod system;
pub mod workers;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .route("/stats", get(system::stats))
        .nest("/jobs", jobs::router())
        .nest("/workers", workers::router())
}

/// Borrow owned query pairs the way the service's query parsers take them.
pub(crate) fn query_pairs(params: &[(String, String)]) -> impl Iterator<Item = (&str, &str)> {
    params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}
