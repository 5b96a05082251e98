// src/api.rs
//! HTTP boundary: trend listing, manual refresh, cache clear and batch generation.
//!
//! Adapter and backend failures never reach this layer as errors; only bad input (400),
//! a missing admin token (401) and an unreachable store (503) do.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::error::PipelineError;
use crate::generate::GeneratedContent;
use crate::ingest::types::{TopicCandidate, TrendSource};
use crate::ingest::{RefreshRequest, TrendAggregator, TrendListing, TrendQuery};
use crate::orchestrator::{BatchRequest, GenerationOrchestrator};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<TrendAggregator>,
    pub orchestrator: Arc<GenerationOrchestrator>,
    /// When set, privileged routes require a matching `x-admin-token` header.
    pub admin_token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/trends", get(list_trends))
        .route("/api/admin/trends/refresh", post(refresh_trends))
        .route("/api/admin/trends/cache", delete(clear_cache))
        .route("/api/admin/articles/generate", post(generate_articles))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    Pipeline(PipelineError),
    Unauthorized,
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::Pipeline(e @ PipelineError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Pipeline(e @ PipelineError::Persistence(_)) => {
                tracing::error!(error = %e, "content store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "admin token required".to_string()),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::Pipeline(PipelineError::InvalidInput(msg.into()))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(());
    };
    let given = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if given == expected {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

fn parse_source(s: &str) -> Result<TrendSource, ApiError> {
    TrendSource::parse(s).ok_or_else(|| invalid(format!("unknown source '{s}'")))
}

fn parse_limit(limit: Option<i64>) -> Result<Option<usize>, ApiError> {
    match limit {
        Some(n) if n < 0 => Err(invalid(format!("limit must be >= 0, got {n}"))),
        Some(n) => Ok(Some(n as usize)),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct TrendsParams {
    source: Option<String>,
    category: Option<String>,
    region: Option<String>,
    limit: Option<i64>,
    #[serde(default)]
    fresh: bool,
}

async fn list_trends(
    State(state): State<AppState>,
    Query(q): Query<TrendsParams>,
) -> Result<Json<TrendListing>, ApiError> {
    let query = TrendQuery {
        source: q.source.as_deref().map(parse_source).transpose()?,
        category: q.category,
        region: q.region,
        limit: parse_limit(q.limit)?,
        fresh: q.fresh,
    };
    Ok(Json(state.aggregator.list_trends(&query).await))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RefreshBody {
    sources: Vec<String>,
    region: Option<String>,
    categories: Vec<String>,
    limit: Option<i64>,
}

async fn refresh_trends(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw: Bytes,
) -> Result<Json<Vec<TopicCandidate>>, ApiError> {
    require_admin(&state, &headers)?;
    // An empty body refreshes every source with defaults.
    let body: RefreshBody = if raw.iter().all(u8::is_ascii_whitespace) {
        RefreshBody::default()
    } else {
        serde_json::from_slice(&raw).map_err(|e| invalid(format!("refresh body: {e}")))?
    };
    let req = RefreshRequest {
        sources: body
            .sources
            .iter()
            .map(|s| parse_source(s))
            .collect::<Result<_, _>>()?,
        region: body.region,
        categories: body.categories,
        limit: parse_limit(body.limit)?,
    };
    Ok(Json(state.aggregator.refresh(&req).await))
}

async fn clear_cache(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    state.aggregator.clear_cache();
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_articles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<GeneratedContent>>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.orchestrator.generate_batch(&req).await?))
}
