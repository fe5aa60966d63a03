//! HTTP layer
//!
//! # Endpoints
//!
//! | Route                              | Handler                   |
//! |------------------------------------|---------------------------|
//! | `GET /health`                      | [`handlers::health`]      |
//! | `GET /metrics`                     | [`handlers::metrics`]     |
//! | `GET /api/v1/fe/{dimension}/{view}`| [`handlers::analytics`]   |
//! | `GET /api/v1/cache/stats`          | [`handlers::cache_stats`] |

pub mod handlers;
pub mod types;

use crate::analytics::AnalyticsEngine;
use crate::cache::{CacheConfig, LocalResultCache, ResultCache};
use crate::config::Config;
use crate::pipeline::DIMENSIONS;
use crate::store::DocumentStore;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state
pub struct AppState {
    /// Analytics engine
    pub engine: AnalyticsEngine,
    /// One response cache per dimension
    pub caches: HashMap<&'static str, Arc<dyn ResultCache>>,
    /// Cache settings (key normalization)
    pub cache_config: CacheConfig,
    /// CORS allowed origins (empty = any)
    pub cors_allowed_origins: Vec<String>,
    /// Serve `/metrics`
    pub metrics_enabled: bool,
}

impl AppState {
    /// State with a process-local cache per dimension
    pub fn new(engine: AnalyticsEngine, cache_config: CacheConfig) -> Self {
        let caches = DIMENSIONS
            .iter()
            .map(|d| {
                let cache: Arc<dyn ResultCache> =
                    Arc::new(LocalResultCache::new(cache_config.clone()));
                (d.name, cache)
            })
            .collect();
        Self::with_caches(engine, caches, cache_config)
    }

    /// State with injected caches
    pub fn with_caches(
        engine: AnalyticsEngine,
        caches: HashMap<&'static str, Arc<dyn ResultCache>>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            engine,
            caches,
            cache_config,
            cors_allowed_origins: Vec::new(),
            metrics_enabled: true,
        }
    }

    /// State built from service configuration
    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> Self {
        let engine = AnalyticsEngine::new(store, config.analytics_config());
        let mut state = Self::new(engine, config.cache_config());
        state.cors_allowed_origins = config.server.cors_allowed_origins.clone();
        state.metrics_enabled = config.monitoring.metrics_enabled;
        state
    }
}

// =============================================================================
// Router
// =============================================================================

/// Build CORS layer from configured origins
pub fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health and metrics
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Analytics
        .route("/api/v1/fe/{dimension}/{view}", get(handlers::analytics))
        // Cache stats
        .route("/api/v1/cache/stats", get(handlers::cache_stats))
        .fallback(handlers::not_found)
        // State and CORS
        .with_state(state.clone())
        .layer(build_cors_layer(&state.cors_allowed_origins))
}
