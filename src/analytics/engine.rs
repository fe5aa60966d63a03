//! Descriptor-driven analytics engine
//!
//! One engine serves every dimension: each view validates its required
//! parameters, compiles the filter, assembles the pipeline for the
//! dimension, runs it against the [`DocumentStore`] and post-processes
//! the output. Parameter errors are raised before any store call.

use crate::error::{Error, Result};
use crate::pipeline::builder::{self, ListQuery, ROW_COUNT_FIELD, VALUE_FIELD};
use crate::pipeline::{Dimension, View};
use crate::postprocess::{self, YearDomain};
use crate::query::ast::{Document, FindQuery, Pipeline};
use crate::query::compiler::compile;
use crate::query::params::AnalyticsRequest;
use crate::store::{DocumentStore, PAPERS};
use crate::types::{InfoRow, ListItem, PagedResult, QuartileResult, TimeSeries, TopKPoint};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsConfig {
    /// Bounds of the years axis
    pub year_domain: YearDomain,
    /// Maximum list suggestions (0 = unbounded)
    pub list_limit: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            year_domain: YearDomain::default(),
            list_limit: 100,
        }
    }
}

/// Analytics engine over a document store
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn DocumentStore>,
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Create an engine
    pub fn new(store: Arc<dyn DocumentStore>, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Engine settings
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run a view and return its JSON payload
    pub async fn execute(
        &self,
        dim: &Dimension,
        view: View,
        req: &AnalyticsRequest,
    ) -> Result<Value> {
        if !dim.supports(view) {
            return Err(Error::NotFound(format!(
                "{} does not serve {}",
                dim.name, view
            )));
        }
        let payload = match view {
            View::Years => serde_json::to_value(self.years(dim, req).await?)?,
            View::Info => serde_json::to_value(self.info(dim, req).await?)?,
            View::Quartiles => serde_json::to_value(self.quartiles(dim, req).await?)?,
            View::TopK => serde_json::to_value(self.topk(dim, req).await?)?,
            View::List => serde_json::to_value(self.list(dim, req).await?)?,
        };
        Ok(payload)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Year distribution, densified over the requested domain
    pub async fn years(&self, dim: &Dimension, req: &AnalyticsRequest) -> Result<TimeSeries> {
        let pipeline = builder::years(dim, &compile(&req.filter));
        let docs = self.aggregate(PAPERS, &pipeline).await?;
        Ok(postprocess::fix_year_data(
            &postprocess::year_points(&docs),
            req.filter.year_start(),
            req.filter.year_end(),
            self.config.year_domain,
        ))
    }

    /// One page of per-group statistics plus the total group count
    pub async fn info(
        &self,
        dim: &Dimension,
        req: &AnalyticsRequest,
    ) -> Result<PagedResult<InfoRow>> {
        let paging = req.require_paging()?;
        let (rows, count) =
            builder::info(dim, &compile(&req.filter), req.sort.as_ref(), paging);

        let (rows, count) = tokio::try_join!(
            self.aggregate(PAPERS, &rows),
            self.aggregate(PAPERS, &count)
        )?;

        Ok(PagedResult {
            row_count: postprocess::row_count(&count, ROW_COUNT_FIELD),
            rows: postprocess::info_rows(&rows),
        })
    }

    /// `[min, Q1, median, Q3, max]` of the per-group metric
    ///
    /// Count-based dimensions summarise papers per group when no metric is
    /// named; `papers` requires one since every group counts a single paper.
    pub async fn quartiles(
        &self,
        dim: &Dimension,
        req: &AnalyticsRequest,
    ) -> Result<QuartileResult> {
        let metric = req.metric_or(dim.quartiles_metric)?;
        let pipeline = builder::quartiles(dim, &compile(&req.filter), metric);
        let docs = self.aggregate(PAPERS, &pipeline).await?;
        Ok(postprocess::compute_quartiles(&postprocess::metric_values(
            &docs,
            VALUE_FIELD,
        )))
    }

    /// Top `k` groups by metric
    pub async fn topk(&self, dim: &Dimension, req: &AnalyticsRequest) -> Result<Vec<TopKPoint>> {
        let k = req.require_k()?;
        let metric = req.require_metric()?;
        let pipeline = builder::topk(dim, &compile(&req.filter), metric, k);
        let docs = self.aggregate(PAPERS, &pipeline).await?;
        Ok(postprocess::topk_points(&docs))
    }

    /// Typeahead suggestions matching `pattern`
    pub async fn list(&self, dim: &Dimension, req: &AnalyticsRequest) -> Result<Vec<ListItem>> {
        let pattern = req.require_pattern()?;
        let column = dim.list_column(req.column()).ok_or_else(|| {
            crate::error::ParameterError::unsupported("column", req.column().unwrap_or_default())
        })?;

        match builder::list(dim, column, pattern, self.config.list_limit) {
            Some(ListQuery::Find {
                collection,
                column,
                query,
            }) => {
                let docs = self.find(collection, &query).await?;
                Ok(postprocess::list_from_documents(&docs, column))
            },
            Some(ListQuery::Distinct {
                collection,
                pipeline,
            }) => {
                let docs = self.aggregate(collection, &pipeline).await?;
                Ok(postprocess::list_from_values(&docs))
            },
            None => Err(Error::NotFound(format!("{} does not serve list", dim.name))),
        }
    }

    // ========================================================================
    // Store access
    // ========================================================================

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>> {
        debug!(
            collection,
            pipeline = %pipeline.to_native(),
            engine = self.store.engine_id(),
            "Running aggregation"
        );
        let start = Instant::now();
        let result = self.store.aggregate(collection, pipeline).await;
        crate::metrics::record_store_query(
            "aggregate",
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result.map_err(|e| {
            error!(collection, error = %e, "Aggregation failed");
            Error::Store(e)
        })
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>> {
        debug!(
            collection,
            filter = %query.filter.to_native(),
            limit = ?query.limit,
            "Running find"
        );
        let start = Instant::now();
        let result = self.store.find(collection, query).await;
        crate::metrics::record_store_query("find", start.elapsed().as_secs_f64(), result.is_ok());
        result.map_err(|e| {
            error!(collection, error = %e, "Find failed");
            Error::Store(e)
        })
    }
}
