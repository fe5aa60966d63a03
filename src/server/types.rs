//! Response types of the HTTP API

use crate::cache::CacheStatsSnapshot;
use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// Health
// =============================================================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `unhealthy`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Backing store identifier
    pub store: String,
    /// Store error when unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// Cache stats
// =============================================================================

/// Cache statistics across dimensions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    /// Per-dimension statistics
    pub dimensions: BTreeMap<&'static str, CacheStatsSnapshot>,
    /// Hits across all dimensions
    pub total_hits: u64,
    /// Misses across all dimensions
    pub total_misses: u64,
    /// Entries across all dimensions
    pub total_entries: u64,
}

impl CacheStatsResponse {
    /// Aggregate per-dimension statistics
    pub fn from_dimensions(dimensions: BTreeMap<&'static str, CacheStatsSnapshot>) -> Self {
        let (total_hits, total_misses, total_entries) = dimensions
            .values()
            .fold((0, 0, 0), |(h, m, e), s| (h + s.hits, m + s.misses, e + s.entries));
        Self {
            dimensions,
            total_hits,
            total_misses,
            total_entries,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error body: `{"message": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub message: String,
}

/// Crate error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    /// Status code for the wrapped error
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Parameter(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            // Store failures surface their raw message
            Error::Store(e) => e.to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
