//! Middleware chain for the HTTP surface.
//!
//! Order, outermost first: request-context logger → trusted-host guard →
//! rate limiter → request-size cap → handlers. Authentication is a
//! handler dependency, not middleware: public endpoints never touch the
//! key store.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, HOST, RETRY_AFTER};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{field, info, info_span, Instrument};
use uuid::Uuid;

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Attaches a request id and tracing context, records request metrics,
/// and echoes the id as `X-Request-ID`.
pub async fn request_context(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client = client_identity(&request);

    // `role` is filled in by the authenticator once the key is validated.
    let span = info_span!(
        "request",
        %request_id,
        %method,
        %path,
        %client,
        role = field::Empty,
    );

    state.metrics.add_gauge("http_requests_active", 1.0, &[]);
    let started = Instant::now();

    let mut response = async {
        info!("request received");
        let response = next.run(request).await;
        let elapsed = started.elapsed().as_secs_f64();

        info!(
            status = response.status().as_u16(),
            duration_ms = (elapsed * 1000.0).round(),
            "request completed"
        );
        response
    }
    .instrument(span)
    .await;

    let elapsed = started.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    state.metrics.increment_counter(
        "http_requests_total",
        1,
        &[("method", &method), ("path", &path), ("status", &status)],
    );
    state.metrics.observe_histogram(
        "http_request_duration_seconds",
        elapsed,
        &[("method", &method), ("path", &path)],
    );
    state.metrics.add_gauge("http_requests_active", -1.0, &[]);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Sliding-window admission control. Rejections are 429 with
/// `Retry-After: 60` and zero remaining; accepted requests get the
/// rate-limit headers on the way out.
pub async fn rate_limit(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.enable_rate_limiting {
        return next.run(request).await;
    }

    let client_id = client_identity(&request);
    let decision = state.limiter.check(&client_id);

    if !decision.allowed {
        state
            .metrics
            .increment_counter("http_requests_rate_limited_total", 1, &[]);

        let detail = decision
            .message
            .unwrap_or_else(|| "rate limit exceeded".to_string());
        let mut response = ApiError {
            status: axum::http::StatusCode::TOO_MANY_REQUESTS,
            detail,
        }
        .into_response();

        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        insert_number(headers, X_RATELIMIT_LIMIT, decision.limit as u64);
        insert_number(headers, X_RATELIMIT_REMAINING, 0);
        return response;
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    insert_number(headers, X_RATELIMIT_LIMIT, decision.limit as u64);
    insert_number(headers, X_RATELIMIT_REMAINING, decision.remaining as u64);
    insert_number(headers, X_RATELIMIT_RESET, decision.reset);
    response
}

/// Rejects requests whose `Host` header is not on the configured allow
/// list. An empty list disables the check; `*` allows everything and a
/// `*.domain` entry matches any subdomain.
pub async fn trusted_hosts(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.trusted_hosts.is_empty() {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(""))
        .unwrap_or("");

    if host_allowed(host, &state.config.trusted_hosts) {
        next.run(request).await
    } else {
        ApiError::bad_request("invalid host header").into_response()
    }
}

fn host_allowed(host: &str, patterns: &[String]) -> bool {
    if host.is_empty() {
        return false;
    }

    patterns.iter().any(|pattern| {
        if pattern == "*" {
            return true;
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            // "*.example.com" keeps the leading dot in the suffix, so
            // "badexample.com" cannot sneak past.
            return host.ends_with(suffix);
        }
        pattern == host
    })
}

/// Rejects oversized bodies up front using the declared `Content-Length`.
pub async fn body_size_cap(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if let Some(length) = declared {
        let cap = state.config.max_request_size_bytes();
        if length > cap {
            return ApiError::payload_too_large(format!(
                "request body too large; max size: {}MB",
                state.config.max_request_size_mb
            ))
            .into_response();
        }
    }

    next.run(request).await
}

/// Identity for rate limiting and log context: API key when present,
/// else the remote address, else `"unknown"`.
fn client_identity(request: &Request) -> String {
    if let Some(key) = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
    {
        if !key.is_empty() {
            return key.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn insert_number(headers: &mut axum::http::HeaderMap, name: HeaderName, value: u64) {
    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
        headers.insert(name, value);
    }
}
