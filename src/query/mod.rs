//! Query layer: request parameters to store-native pipelines
//!
//! # Architecture
//!
//! ```text
//! Query string
//!      │
//!      ▼
//! ┌─────────────┐
//! │   Params    │  Raw map → FilterSpec, SortSpec, required params
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Compiler   │  FilterSpec → $match, SortSpec → $sort / $skip 0
//! └─────────────┘
//!      │
//!      ▼
//! ┌─────────────┐
//! │    AST      │  Typed stages, rendered to native JSON
//! └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use scholar_analytics::query::{compile, FilterSpec, RawParams};
//!
//! let mut params = RawParams::new();
//! params.insert("yearStart".to_string(), "2015".to_string());
//!
//! let filter = FilterSpec::from_params(&params).unwrap();
//! let expr = compile(&filter);
//! assert_eq!(expr.to_native(), serde_json::json!({"yearPublished": {"$gte": 2015}}));
//! ```

pub mod ast;
pub mod compiler;
pub mod params;

pub use ast::{
    Accumulator, Clause, Condition, Direction, Document, Expr, FindQuery, MatchExpr, Pipeline,
    Projection, Stage,
};
pub use compiler::{compile, compile_sort};
pub use params::{AnalyticsRequest, FilterSpec, Paging, RawParams, SortSpec};
