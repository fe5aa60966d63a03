//! Scholar Analytics - query-filter and aggregation engine for scholarly paper metadata
//!
//! This library provides the analytics backend of a paper corpus explorer:
//! - Declarative query parameters parsed into typed filters
//! - Filters compiled into store-native aggregation pipelines
//! - One descriptor-driven engine serving every entity dimension
//! - Year densification, quartiles, top-k rankings and paged summaries
//! - Per-dimension response caching keyed by request URL

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Query parameters, filter compilation and pipeline AST
pub mod query;

/// Dimension descriptors and per-view pipeline assembly
pub mod pipeline;

/// Result post-processing (year densification, quartiles, row shaping)
pub mod postprocess;

/// Document store trait and in-memory implementation
pub mod store;

/// Analytics engine
pub mod analytics;

/// Response caching
pub mod cache;

/// Configuration management with TOML support
pub mod config;

/// Prometheus metrics and telemetry
pub mod metrics;

/// HTTP router, state and handlers
pub mod server;

// Re-export main types
pub use analytics::{AnalyticsConfig, AnalyticsEngine};
pub use error::{Error, Result};
pub use pipeline::{Dimension, View};
pub use query::{AnalyticsRequest, FilterSpec, SortSpec};
pub use store::{DocumentStore, InMemoryStore};
