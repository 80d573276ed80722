use crate::batch::{BatchJob, BatchProcessor};
use crate::config::Config;
use crate::context::CompanyContext;
use crate::credential::ApiKey;
use crate::errors::{AppError, ResultExt};
use crate::models::*;
use crate::prompts::{PromptContext, PromptOverrides};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::Instrument;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

/// Maximum accepted request body.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Company context document loaded at startup.
    pub company: Arc<CompanyContext>,
    /// Runs batches against the language model.
    pub processor: BatchProcessor,
}

#[derive(OpenApi)]
#[openapi(
    paths(process_leads, health, root),
    components(schemas(
        ProcessRequest,
        Lead,
        ProcessResponse,
        LeadOutcome,
        LeadFailure,
        FailureKind,
        Stage
    )),
    tags((name = "leads", description = "Lead scoring and outreach generation"))
)]
pub struct ApiDoc;

/// Health check endpoint.
///
/// Returns the service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy"))
)]
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Service identity.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service identity"))
)]
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": "llm-backend",
        "status": "online"
    }))
}

/// POST /process-leads
///
/// Scores every lead and writes outreach for the ones that qualify. Results
/// come back in input order, one per lead; leads that could not be processed
/// are listed in `errors` and keep null result fields.
#[utoipa::path(
    post,
    path = "/process-leads",
    tag = "leads",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Batch processed", body = ProcessResponse),
        (status = 400, description = "Missing leads, missing api_key or malformed body")
    )
)]
pub async fn process_leads(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection);
        AppError::BadRequest(rejection.body_text())
    })?;

    if payload.leads.is_empty() {
        return Err(AppError::BadRequest("No leads provided".to_string()));
    }
    if payload.leads.len() > state.config.max_batch_size {
        return Err(AppError::BadRequest(format!(
            "Too many leads: {} (maximum is {})",
            payload.leads.len(),
            state.config.max_batch_size
        )));
    }
    let credential =
        ApiKey::parse(&payload.api_key).context("Rejected process-leads request")?;

    let overrides = PromptOverrides::from_request(&payload);
    let prompts = PromptContext::new(&state.company, overrides);
    let batch_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "batch",
        %batch_id,
        credential = %credential.fingerprint()
    );

    tracing::info!(
        parent: &span,
        "POST /process-leads - {} lead(s)",
        payload.leads.len()
    );

    let started = Instant::now();
    let report = state
        .processor
        .process(BatchJob {
            leads: payload.leads,
            credential,
            prompts,
        })
        .instrument(span)
        .await;
    let duration_sec = round_millis(started.elapsed().as_secs_f64());

    Ok(Json(ProcessResponse {
        batch_id,
        results: report.results,
        errors: report.errors,
        duration_sec,
        processed_at: chrono::Utc::now(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Routes that do the actual work. The binary adds rate limiting on top.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/process-leads", post(process_leads))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Full application around the given protected routes.
pub fn assemble(state: Arc<AppState>, protected: Router<Arc<AppState>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
}

/// Application router without rate limiting.
pub fn router(state: Arc<AppState>) -> Router {
    assemble(state, protected_routes())
}
