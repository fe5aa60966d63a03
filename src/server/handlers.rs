//! HTTP handlers
//!
//! # Response caching
//!
//! Analytics responses are cached per dimension under the request URL:
//! - the cache is consulted before the request is even parsed
//! - only successful payloads are stored
//! - entries expire by TTL (if configured) or on restart

use super::types::{ApiError, CacheStatsResponse, ErrorResponse, HealthResponse};
use super::AppState;
use crate::cache::cache_key;
use crate::error::Error;
use crate::pipeline::{Dimension, View};
use crate::query::params::{AnalyticsRequest, RawParams};
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

// =============================================================================
// Health & Metrics
// =============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.engine.store();
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                store: store.engine_id().to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    version: env!("CARGO_PKG_VERSION"),
                    store: store.engine_id().to_string(),
                    error: Some(e.to_string()),
                }),
            )
        },
    }
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    if !state.metrics_enabled {
        return not_found().await.into_response();
    }

    for (name, cache) in &state.caches {
        crate::metrics::update_cache_entries(name, cache.stats().entries);
    }

    match crate::metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, [("content-type", "text/plain")], body).into_response(),
        Err(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { message }),
        )
            .into_response(),
    }
}

/// Cache statistics per dimension
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    let dimensions: BTreeMap<_, _> = state
        .caches
        .iter()
        .map(|(name, cache)| (*name, cache.stats()))
        .collect();
    Json(CacheStatsResponse::from_dimensions(dimensions))
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            message: "Not found".to_string(),
        }),
    )
}

// =============================================================================
// Analytics
// =============================================================================

/// `GET /api/v1/fe/{dimension}/{view}`
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Path((dimension, view)): Path<(String, String)>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<RawParams>,
) -> Response {
    let response = serve_analytics(&state, &dimension, &view, &uri, &params).await;
    let status = match &response {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    crate::metrics::record_request(&dimension, &view, status.as_u16());

    match response {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(e) => {
            debug!(dimension = %dimension, view = %view, error = %e.0, "Analytics request failed");
            e.into_response()
        },
    }
}

async fn serve_analytics(
    state: &AppState,
    dimension: &str,
    view: &str,
    uri: &axum::http::Uri,
    params: &RawParams,
) -> Result<Value, ApiError> {
    let dim = Dimension::lookup(dimension)
        .ok_or_else(|| Error::NotFound(format!("Unknown dimension: {}", dimension)))?;
    let view = View::parse(view)
        .filter(|v| dim.supports(*v))
        .ok_or_else(|| Error::NotFound(format!("{} does not serve {}", dim.name, view)))?;

    let key = cache_key(uri.path(), uri.query(), state.cache_config.normalize_keys);
    let cache = state.caches.get(dim.name);

    if let Some(cache) = cache {
        let cached = cache.get(&key).await;
        crate::metrics::record_cache_lookup(dim.name, cached.is_some());
        if let Some(payload) = cached {
            debug!(key = %key, "Cache hit");
            return Ok(payload);
        }
    }

    let req = AnalyticsRequest::parse(params).map_err(Error::from)?;
    let payload = state.engine.execute(dim, view, &req).await?;

    if let Some(cache) = cache {
        cache.set(&key, payload.clone(), None).await;
    }
    Ok(payload)
}
