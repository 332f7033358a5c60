use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::lookup::LookupResult;
use crate::metrics::render_metrics;
use crate::server::AppState;

pub const X_CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn get_order(State(state): State<AppState>, Path(order_uid): Path<String>) -> Response {
    match state.lookup.get_order(&order_uid).await {
        LookupResult::Hit(raw) => order_response(raw, "HIT"),
        LookupResult::Miss(raw) => order_response(raw, "MISS"),
        LookupResult::NotFound => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

fn order_response(raw: Bytes, cache_status: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (X_CACHE_HEADER, cache_status),
        ],
        raw,
    )
        .into_response()
}

pub async fn missing_order_id() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "missing order id")
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready while the ingest stream is open.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.cache.stats();
    let ready = !state.stream.is_closed();
    let body = json!({
        "status": if ready { "ready" } else { "not ready" },
        "store": state.store.backend_name(),
        "cache": {
            "entries": cache.len,
            "capacity": cache.capacity,
            "hit_rate": cache.hit_rate(),
        },
        "stream": {
            "topic": state.stream.topic(),
            "pending": state.stream.pending(),
        },
    });
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

pub async fn metrics() -> Response {
    match render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}

/// Appends the request body to the ingest stream.
pub async fn publish(State(state): State<AppState>, body: Bytes) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty payload").into_response();
    }
    match state.stream.publisher().publish(None, body) {
        Ok(offset) => {
            tracing::debug!(offset, "message published over http");
            (
                StatusCode::ACCEPTED,
                Json(json!({ "topic": state.stream.topic(), "offset": offset })),
            )
                .into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}
