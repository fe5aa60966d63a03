//! Document store abstraction
//!
//! The analytics engine talks to its backing store only through the
//! [`DocumentStore`] trait. A store receives typed pipelines
//! ([`Pipeline`]) and lookups ([`FindQuery`]); native backends render them
//! with `to_native()`, while [`InMemoryStore`] evaluates them directly.

pub mod memory;
pub mod value;

use crate::error::StoreError;
use crate::query::ast::{Document, FindQuery, Pipeline};
use async_trait::async_trait;

pub use memory::InMemoryStore;

/// Collection holding paper documents
pub const PAPERS: &str = "papers";
/// Collection holding author documents
pub const AUTHORS: &str = "authors";
/// Collection holding venue documents
pub const VENUES: &str = "venues";

// =============================================================================
// DocumentStore Trait
// =============================================================================

/// Core trait for document store backends
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Unique identifier for this backend
    fn engine_id(&self) -> &str;

    /// Run an aggregation pipeline over a collection
    ///
    /// Unknown collections behave as empty.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Document>, StoreError>;

    /// Filtered projection over a collection
    async fn find(&self, collection: &str, query: &FindQuery)
        -> Result<Vec<Document>, StoreError>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}
