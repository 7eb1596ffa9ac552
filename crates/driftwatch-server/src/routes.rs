//! # HTTP Surface
//!
//! Endpoint contracts:
//!
//! | Method & Path | Auth | Role |
//! |---|---|---|
//! | GET `/` | none | any |
//! | GET `/health`, `/metrics` | none | any (404 when disabled) |
//! | GET `/status`, `/dashboard` | none | any |
//! | GET `/templates`, `/templates/{id}` | none | any |
//! | POST `/templates`, `/captures` | required | operator, admin |
//! | GET `/logs`, `/logs/export` | none | any |
//! | POST `/auth/token` | required | admin |
//! | POST `/auth/validate` | required | any |
//! | GET `/auth/keys` | required | admin |
//!
//! Errors are `{"detail": "<message>"}` with the statuses the contract
//! prescribes. Authentication is a per-handler dependency resolved via
//! the `X-API-Key` header.

use crate::auth::{KeyRecord, Role};
use crate::builder::TemplateBuilder;
use crate::error::ApiError;
use crate::export::{render, ExportFormat};
use crate::middleware::{body_size_cap, rate_limit, request_context, trusted_hosts};
use crate::recorder::Recorder;
use crate::state::SharedState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use driftwatch_baseline::Template;
use driftwatch_core::{HealthReport, MetricsSnapshot, SignatureTriple};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

/// Builds the full service router with its middleware chain.
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .route("/status", get(status))
        .route("/templates", get(list_templates).post(build_template))
        .route("/templates/:screen_id", get(get_template))
        .route("/captures", post(create_capture))
        .route("/logs", get(get_logs))
        .route("/logs/export", get(export_logs))
        .route("/dashboard", get(dashboard))
        .route("/auth/token", post(create_token))
        .route("/auth/validate", post(validate_token))
        .route("/auth/keys", get(list_keys))
        .with_state(state.clone())
        // Innermost to outermost: size cap, rate limiter, trusted-host
        // guard, request context.
        .layer(middleware::from_fn_with_state(state.clone(), body_size_cap))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), trusted_hosts))
        .layer(middleware::from_fn_with_state(state, request_context))
        .layer(cors)
}

fn cors_layer(config: &driftwatch_core::Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

// Request / response bodies.

#[derive(Debug, Deserialize)]
struct CaptureRequest {
    tree: Option<Value>,
    #[serde(default)]
    #[allow(dead_code)]
    app: Option<String>,
}

#[derive(Debug, Serialize)]
struct CaptureResponse {
    path: String,
    normalized: Value,
    signatures: SignatureTriple,
    captured_at: String,
}

#[derive(Debug, Deserialize)]
struct BuildTemplateQuery {
    capture_path: String,
    screen_id: String,
    #[serde(default = "default_app")]
    app: String,
}

fn default_app() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Serialize)]
struct LogEntryResponse {
    timestamp: f64,
    data: Value,
    entry_hash: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    version: String,
    log_path: String,
    log_size: usize,
    template_count: usize,
    log_integrity: String,
    recent_events: Vec<String>,
}

#[derive(Debug, Serialize)]
struct DashboardData {
    timestamp: String,
    recent_drifts: Vec<Value>,
    compliance: f64,
    total_events: usize,
}

#[derive(Debug, Deserialize)]
struct TokenRequest {
    name: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    name: String,
    role: String,
    message: String,
}

// Handlers.

async fn root() -> Json<Value> {
    Json(json!({
        "service": "DriftWatch",
        "version": env!("CARGO_PKG_VERSION"),
        "authentication": "X-API-Key header required for POST endpoints",
        "endpoints": {
            "auth": "POST /auth/token (admin), POST /auth/validate",
            "captures": "POST /captures (requires auth)",
            "templates": "GET /templates, POST /templates (requires auth)",
            "logs": "GET /logs, GET /logs/export",
            "status": "GET /status",
            "dashboard": "GET /dashboard"
        }
    }))
}

async fn health(State(state): State<SharedState>) -> Result<Json<HealthReport>, ApiError> {
    if !state.config.enable_health {
        return Err(ApiError::not_found("health endpoint disabled"));
    }
    Ok(Json(state.health.run_checks()))
}

async fn metrics_snapshot(
    State(state): State<SharedState>,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    if !state.config.enable_metrics {
        return Err(ApiError::not_found("metrics endpoint disabled"));
    }
    Ok(Json(state.metrics.snapshot()))
}

async fn status(State(state): State<SharedState>) -> Result<Json<StatusResponse>, ApiError> {
    let pipeline = state.pipeline();
    let log = pipeline.log();

    let log_integrity = if log.verify_integrity() {
        "valid".to_string()
    } else {
        "INVALID".to_string()
    };

    let log_size = log.len();
    let recent_events = log
        .get_entries(log_size.saturating_sub(5), None)
        .iter()
        .map(|entry| {
            let kind = entry
                .data
                .get("drift_type")
                .or_else(|| entry.data.get("event_type"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            format!("{} at {}", kind, entry.timestamp)
        })
        .collect();

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        log_path: state.config.log_path.display().to_string(),
        log_size,
        template_count: pipeline.templates().len(),
        log_integrity,
        recent_events,
    }))
}

async fn list_templates(State(state): State<SharedState>) -> Json<Vec<Template>> {
    let snapshot = state.pipeline().templates().snapshot();
    Json(snapshot.values().cloned().collect())
}

async fn get_template(
    State(state): State<SharedState>,
    Path(screen_id): Path<String>,
) -> Result<Json<Template>, ApiError> {
    state
        .pipeline()
        .templates()
        .get(&screen_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("template not found: {}", screen_id)))
}

async fn build_template(
    State(state): State<SharedState>,
    Query(query): Query<BuildTemplateQuery>,
    headers: HeaderMap,
) -> Result<Json<Template>, ApiError> {
    let record = authenticate(&state, &headers)?;
    require_role(&record, &[Role::Operator, Role::Admin])?;

    if query.screen_id.is_empty() {
        return Err(ApiError::unprocessable("screen_id must not be empty"));
    }

    let builder = TemplateBuilder::new();
    let template = builder.build_from_capture(
        std::path::Path::new(&query.capture_path),
        &query.screen_id,
        &query.app,
    )?;

    let output = state
        .config
        .templates_dir
        .join(format!("{}.yaml", query.screen_id));
    builder.save_yaml(&template, &output)?;
    state.pipeline().reload_templates()?;

    Ok(Json(template))
}

async fn create_capture(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let record = authenticate(&state, &headers)?;
    require_role(&record, &[Role::Operator, Role::Admin])?;

    let tree = request
        .tree
        .ok_or_else(|| ApiError::unprocessable("capture request must include a tree"))?;

    let recorded = Recorder::new(&state.config.captures_dir).record(&tree)?;
    state
        .metrics
        .increment_counter("captures_recorded_total", 1, &[]);

    Ok(Json(CaptureResponse {
        path: recorded.path.display().to_string(),
        normalized: recorded.capture.normalized,
        signatures: recorded.capture.signatures,
        captured_at: recorded.capture.captured_at,
    }))
}

async fn get_logs(
    State(state): State<SharedState>,
    Query(query): Query<LogsQuery>,
) -> Json<Vec<LogEntryResponse>> {
    let pipeline = state.pipeline();
    let entries = pipeline
        .log()
        .get_entries(query.offset, Some(query.offset + query.limit));

    Json(
        entries
            .iter()
            .map(|entry| LogEntryResponse {
                timestamp: entry.timestamp,
                data: entry.data.clone(),
                entry_hash: entry.entry_hash.clone(),
            })
            .collect(),
    )
}

async fn export_logs(
    State(state): State<SharedState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(&query.format)?;

    let pipeline = state.pipeline();
    let log = pipeline.log();
    if log.is_empty() {
        return Err(ApiError::not_found("no logs found"));
    }

    let rendered = render(log.get_entries(0, None), format)?;
    let filename = format!(
        "logs_{}.{}",
        chrono::Utc::now().format("%Y%m%dT%H%M%S"),
        format.extension()
    );

    Ok((
        [
            ("content-type", format.content_type().to_string()),
            (
                "content-disposition",
                format!("attachment; filename={}", filename),
            ),
        ],
        rendered,
    )
        .into_response())
}

async fn dashboard(State(state): State<SharedState>) -> Json<DashboardData> {
    let pipeline = state.pipeline();
    let log = pipeline.log();

    let total_events = log.len();
    let recent = log.get_entries(total_events.saturating_sub(10), None);

    let mut critical_count = 0;
    let recent_drifts: Vec<Value> = recent
        .iter()
        .map(|entry| {
            let severity = entry
                .data
                .get("severity")
                .and_then(Value::as_str)
                .unwrap_or("info");
            if severity == "critical" {
                critical_count += 1;
            }
            json!({
                "timestamp": entry.timestamp,
                "drift_type": entry.data.get("drift_type").and_then(Value::as_str).unwrap_or("unknown"),
                "severity": severity,
            })
        })
        .collect();

    let compliance = if recent.is_empty() {
        1.0
    } else {
        1.0 - critical_count as f64 / recent.len() as f64
    };

    Json(DashboardData {
        timestamp: chrono::Utc::now().to_rfc3339(),
        recent_drifts,
        compliance: compliance.clamp(0.0, 1.0),
        total_events,
    })
}

async fn create_token(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let record = authenticate(&state, &headers)?;
    require_role(&record, &[Role::Admin])?;

    let role_name = request.role.unwrap_or_else(|| "readonly".to_string());
    let role = Role::parse(&role_name)
        .ok_or_else(|| ApiError::unprocessable(format!("invalid role: {}", role_name)))?;

    let token = state
        .keys
        .create_key(&request.name, role, request.description.as_deref().unwrap_or(""))?;

    Ok(Json(TokenResponse {
        token,
        name: request.name,
        role: role.as_str().to_string(),
        message: "Token created successfully. Save it securely - it will not be shown again."
            .to_string(),
    }))
}

async fn validate_token(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let record = authenticate(&state, &headers)?;

    Ok(Json(json!({
        "valid": true,
        "name": record.name,
        "role": record.role.as_str(),
        "permissions": record.role.permissions(),
        "created_at": record.created_at,
        "last_used": record.last_used,
        "use_count": record.use_count,
    })))
}

async fn list_keys(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let record = authenticate(&state, &headers)?;
    require_role(&record, &[Role::Admin])?;

    let keys = state.keys.list_keys()?;
    Ok(Json(json!({ "total": keys.len(), "keys": keys })))
}

// Auth helpers.

/// Resolves and validates the `X-API-Key` header. 401 when absent, 403
/// when unknown or revoked. Successful validation records the role on the
/// request span.
fn authenticate(state: &SharedState, headers: &HeaderMap) -> Result<KeyRecord, ApiError> {
    let key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if key.is_empty() {
        return Err(ApiError::unauthorized(
            "Missing API key. Provide X-API-Key header.",
        ));
    }

    match state.keys.validate(key)? {
        None => Err(ApiError::forbidden("Invalid API key")),
        Some(record) => {
            tracing::Span::current().record("role", record.role.as_str());
            Ok(record)
        }
    }
}

/// 403 with the required-roles list when the record's role is not listed.
fn require_role(record: &KeyRecord, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&record.role) {
        return Ok(());
    }

    let roles: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    Err(ApiError::forbidden(format!(
        "Insufficient permissions. Required roles: {}",
        roles.join(", ")
    )))
}
