use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::metrics;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

// Middleware that ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    // Preserve an incoming id, otherwise generate one
    let req_id_value = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());

    // Add to request extensions for downstream usage (e.g., logging)
    if let Some(value) = &req_id_value {
        req.extensions_mut().insert(value.clone());
    }

    let mut res = next.run(req).await;

    if let Some(value) = req_id_value {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Records request count and latency per matched route.
///
/// Must be installed with `route_layer` so `MatchedPath` is available.
pub async fn http_metrics(req: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let res = next.run(req).await;

    metrics::record_http_request(
        method.as_str(),
        &route,
        res.status().as_u16(),
        started.elapsed(),
    );
    res
}
