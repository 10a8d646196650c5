//! HTTP transport module for the promptgate server
//!
//! Axum-based server exposing the generation/export pipeline plus plain-JSON
//! health, info, and metrics endpoints. Session resolution happens upstream;
//! handlers read the already-resolved `{user_id, plan}` facts from request
//! headers and pass the plan explicitly into every gate check. An optional
//! bearer token guards everything except /health.

use crate::entitlement::{Entitlement, Plan};
use crate::error::{PromptGateError, Result};
use crate::pipeline::export::{ExportOutcome, ExportRequest};
use crate::pipeline::generate::{GenerateOutcome, GenerateRequest};
use crate::pipeline::tighten::TightenRequest;
use crate::server::PromptGateServer;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::{cmp::Ordering, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use uuid::Uuid;

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub server: PromptGateServer,
    pub metrics: Arc<Mutex<HttpMetrics>>,
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub last_request_unix: u64,
    pub errors_total: u64,
    pub denials_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    pub formats_count: std::collections::HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            last_request_unix: std::time::SystemTime::UNIX_EPOCH
                .elapsed()
                .unwrap_or_default()
                .as_secs(),
            errors_total: 0,
            denials_total: 0,
            latencies: Vec::with_capacity(256),
            formats_count: std::collections::HashMap::new(),
        }
    }
}

/// Resolved caller identity, as supplied by the upstream session service.
struct Caller {
    plan: Plan,
    user_id: Option<String>,
}

/// Read the session facts from headers. A missing plan falls back to free
/// (the most restrictive tier); a malformed one is a caller mistake.
fn caller(headers: &HeaderMap) -> Result<Caller> {
    let plan = match headers.get("x-plan").and_then(|v| v.to_str().ok()) {
        Some(raw) => raw
            .parse::<Plan>()
            .map_err(|e| PromptGateError::Validation { message: e })?,
        None => Plan::Free,
    };
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    Ok(Caller { plan, user_id })
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let catalog = &state.server.catalog;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "catalog": {
                "version": catalog.version,
                "modules": catalog.modules.len(),
                "formats": catalog.formats.iter().map(|f| json!({
                    "id": f.id,
                    "min_plan": f.min_plan,
                })).collect::<Vec<_>>(),
            },
            "server": {
                "bind": state.server.config.runtime.http_bind.to_string(),
            }
        })
        .to_string(),
    )
}

/// Metrics endpoint
pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();

    // Compute latency stats
    let (avg_latency_ms, p95_latency_ms) = if metrics.latencies.is_empty() {
        (None, None)
    } else {
        let sum: f64 = metrics.latencies.iter().sum();
        let avg = sum / metrics.latencies.len() as f64;
        let mut sorted = metrics.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = (sorted.len() as f64 * 0.95) as usize;
        let p95 = sorted.get(p95_idx).copied();
        (Some(avg), p95)
    };

    // Top 5 export formats
    let mut formats_vec: Vec<_> = metrics.formats_count.iter().collect();
    formats_vec.sort_by(|a, b| b.1.cmp(a.1));
    let formats_top_5: Vec<_> = formats_vec
        .into_iter()
        .take(5)
        .map(|(k, v)| json!({ "format": k, "count": v }))
        .collect();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json!({
            "metrics_version": "1",
            "total_requests": metrics.total_requests,
            "last_request_unix": metrics.last_request_unix,
            "errors_total": metrics.errors_total,
            "denials_total": metrics.denials_total,
            "avg_latency_ms": avg_latency_ms,
            "p95_latency_ms": p95_latency_ms,
            "formats_top_5": formats_top_5
        })
        .to_string(),
    )
}

async fn generate_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Response> {
    let caller = caller(&headers)?;
    let outcome = state
        .server
        .handle_generate(request, caller.plan, caller.user_id.as_deref())
        .await?;
    Ok(match outcome {
        GenerateOutcome::Run(run) => (StatusCode::OK, Json(json!(run))).into_response(),
        GenerateOutcome::Invalid(report) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(json!(report))).into_response()
        }
    })
}

async fn export_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
    Json(request): Json<ExportRequest>,
) -> Result<Response> {
    let caller = caller(&headers)?;
    let outcome = state
        .server
        .handle_export(request.run_id, &request.format, caller.plan)
        .await?;
    Ok(match outcome {
        ExportOutcome::Exported(artifact) => {
            let mut metrics = state.metrics.lock().await;
            *metrics
                .formats_count
                .entry(artifact.format.clone())
                .or_insert(0) += 1;
            drop(metrics);
            (StatusCode::OK, Json(json!(artifact))).into_response()
        }
        ExportOutcome::Denied(denial) => {
            state.metrics.lock().await.denials_total += 1;
            (denial.status(), Json(json!(denial))).into_response()
        }
    })
}

async fn tighten_handler(
    State(state): State<HttpState>,
    Json(request): Json<TightenRequest>,
) -> Result<Response> {
    let response = state.server.handle_tighten(request).await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// Capability snapshot for the caller's plan; what the dashboard paywall
/// renders from.
async fn entitlements_handler(
    State(state): State<HttpState>,
    headers: HeaderMap,
) -> Result<Response> {
    let caller = caller(&headers)?;
    let entitlement = Entitlement::for_plan(caller.plan, &state.server.catalog);
    Ok((StatusCode::OK, Json(json!(entitlement))).into_response())
}

async fn run_handler(
    State(state): State<HttpState>,
    Path(run_id): Path<Uuid>,
) -> Result<Response> {
    let run = state.server.get_run(run_id).await?;
    Ok((StatusCode::OK, Json(json!(run))).into_response())
}

async fn suggestions_handler(
    State(state): State<HttpState>,
    Path(run_id): Path<Uuid>,
) -> Result<Response> {
    let suggestions = state.server.handle_suggestions(run_id).await?;
    Ok((StatusCode::OK, Json(json!(suggestions))).into_response())
}

/// Build the full application router; shared by the binary and by tests.
pub fn build_router(server: PromptGateServer) -> Router {
    let state = HttpState {
        metrics: Arc::new(Mutex::new(HttpMetrics::new())),
        server: server.clone(),
    };
    let timeout = Duration::from_millis(server.config.runtime.http_request_timeout_ms);

    Router::new()
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/metrics", get(metrics_handler))
        .route("/generate", post(generate_handler))
        .route("/export", post(export_handler))
        .route("/tighten", post(tighten_handler))
        .route("/runs/:run_id", get(run_handler))
        .route("/suggestions/:run_id", get(suggestions_handler))
        .route("/entitlements", get(entitlements_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let is_pipeline = !matches!(
                    req.uri().path(),
                    "/health" | "/info" | "/metrics"
                );
                let start = if is_pipeline {
                    Some(std::time::Instant::now())
                } else {
                    None
                };
                let resp = next.run(req).await;
                if let Some(start_time) = start {
                    let latency_ms = start_time.elapsed().as_millis() as f64;
                    let mut m = metrics.lock().await;
                    if latency_ms > 0.0 {
                        m.latencies.push(latency_ms);
                        if m.latencies.len() > 256 {
                            m.latencies.remove(0);
                        }
                    }
                    if resp.status().is_server_error() {
                        m.errors_total = m.errors_total.saturating_add(1);
                    }
                    m.total_requests = m.total_requests.saturating_add(1);
                    m.last_request_unix = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs();
                }
                resp
            },
        ))
        // Bearer auth layer with explicit state; only active when a token is
        // configured, /health stays open either way
        .layer(middleware::from_fn_with_state(
            server.config.runtime.bearer_token.clone(),
            |State(token): State<Option<String>>,
             req: axum::http::Request<Body>,
             next: axum::middleware::Next| async move {
                let expected = match token {
                    Some(t) => t,
                    None => return next.run(req).await,
                };
                if req.uri().path() == "/health" {
                    return next.run(req).await;
                }
                let header_ok = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|h| h.to_str().ok())
                    .map(|v| v == format!("Bearer {}", expected))
                    .unwrap_or(false);
                if !header_ok {
                    return (
                        StatusCode::UNAUTHORIZED,
                        [(header::CONTENT_TYPE, "application/json")],
                        json!({"error": {"code": 401, "message": "Unauthorized"}}).to_string(),
                    )
                        .into_response();
                }
                next.run(req).await
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(server: PromptGateServer) -> Result<()> {
    let bind = server.config.runtime.http_bind;
    let app = build_router(server);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
