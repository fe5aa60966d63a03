//! Analytics views over the paper corpus
//!
//! # Views
//!
//! | View        | Required params     | Payload                       |
//! |-------------|---------------------|-------------------------------|
//! | `years`     |                     | `{years, counts}`             |
//! | `info`      | `page`, `pageSize`  | `{rowCount, rows}`            |
//! | `quartiles` | `metric` (`papers`) | `[min, Q1, median, Q3, max]`  |
//! | `topk`      | `k`, `metric`       | `[{x, y}]`                    |
//! | `list`      | `pattern`           | `[{_id?, value}]`             |
//!
//! Other dimensions default the quartiles metric to `papersCount`.
//!
//! # Example
//!
//! ```rust
//! use scholar_analytics::analytics::{AnalyticsConfig, AnalyticsEngine};
//! use scholar_analytics::pipeline::{Dimension, View};
//! use scholar_analytics::query::{AnalyticsRequest, RawParams};
//! use scholar_analytics::store::InMemoryStore;
//! use std::sync::Arc;
//!
//! # tokio_test_block(async {
//! let engine = AnalyticsEngine::new(Arc::new(InMemoryStore::new()), AnalyticsConfig::default());
//! let dim = Dimension::lookup("papers").unwrap();
//! let req = AnalyticsRequest::parse(&RawParams::new()).unwrap();
//! let payload = engine.execute(dim, View::Years, &req).await.unwrap();
//! assert_eq!(payload["years"].as_array().unwrap().len(), 2022 - 1936 + 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f);
//! # }
//! ```

pub mod engine;

pub use engine::{AnalyticsConfig, AnalyticsEngine};
