//! Aggregation pipeline assembly
//!
//! Composes the per-view stage sequences for a [`Dimension`]. All paper
//! views run against the papers collection and start with the compiled
//! filter.
//!
//! ```text
//! years      match → unwind → group(year) → project(count) → sort(year) → group(all)
//! info       match → unwind(keep nulls) → group(dim) → project → sort|skip 0 → skip → limit
//! info count match → unwind(keep nulls) → group(dim) → count
//! quartiles  match → unwind → group(dim, metric) → sort(value asc)
//! topk       match → unwind → group(dim, metric) → sort(value desc) → limit(k) → project(x, y)
//! ```

use crate::pipeline::dimension::{Dimension, ListSource, YearMetric};
use crate::query::ast::{
    Accumulator, Clause, Condition, Direction, Expr, FindQuery, MatchExpr, Pipeline, Projection,
    Stage,
};
use crate::query::compiler::compile_sort;
use crate::query::params::{Paging, SortSpec};
use crate::store::PAPERS;
use crate::types::Metric;

/// Output field holding the dimension value of an info row
pub const KEY_FIELD: &str = "key";
/// Output field of the count pipeline
pub const ROW_COUNT_FIELD: &str = "rowCount";
/// Output field holding the summed metric of a group
pub const VALUE_FIELD: &str = "value";

fn unwind(dim: &Dimension, preserve_null: bool) -> Option<Stage> {
    dim.unwind.then(|| Stage::Unwind {
        path: dim.field.to_string(),
        preserve_null,
    })
}

/// Drop papers without a value for the dimension
///
/// Unwinding a scalar field passes the document through and drops nulls,
/// so the same stage serves scalar and array dimensions.
fn unwind_present(dim: &Dimension) -> Option<Stage> {
    (dim.field != "_id").then(|| Stage::Unwind {
        path: dim.field.to_string(),
        preserve_null: false,
    })
}

fn field(name: &str) -> Expr {
    Expr::field(name)
}

fn named(name: &str, acc: Accumulator) -> (String, Accumulator) {
    (name.to_string(), acc)
}

fn computed(name: &str, expr: Expr) -> (String, Projection) {
    (name.to_string(), Projection::Compute(expr))
}

// =============================================================================
// years
// =============================================================================

/// Year distribution pipeline
///
/// Emits at most one document `{years: [...], counts: [...]}` with years
/// ascending; the null year, if present, sorts first.
pub fn years(dim: &Dimension, filter: &MatchExpr) -> Pipeline {
    let per_year = match dim.year_metric {
        YearMetric::Distinct => vec![
            Stage::Group {
                id: field("yearPublished"),
                fields: vec![named("values", Accumulator::AddToSet(field(dim.field)))],
            },
            Stage::Project(vec![computed(
                "count",
                Expr::Size(Box::new(field("values"))),
            )]),
        ],
        YearMetric::Sum(source) => vec![Stage::Group {
            id: field("yearPublished"),
            fields: vec![named("count", Accumulator::Sum(field(source)))],
        }],
    };

    let pre = Pipeline::new().stage(Stage::Match(filter.clone()));
    let pre = match dim.year_metric {
        YearMetric::Distinct => pre.maybe_stage(unwind_present(dim)),
        YearMetric::Sum(_) => pre,
    };

    per_year
        .into_iter()
        .fold(pre, Pipeline::stage)
        .stage(Stage::Sort(vec![("_id".to_string(), Direction::Asc)]))
        .stage(Stage::Group {
            id: Expr::literal(serde_json::Value::Null),
            fields: vec![
                named("years", Accumulator::Push(field("_id"))),
                named("counts", Accumulator::Push(field("count"))),
            ],
        })
}

// =============================================================================
// info
// =============================================================================

fn info_group(dim: &Dimension) -> Stage {
    let mut fields = vec![
        named("papersCount", Accumulator::Sum(Expr::literal(1))),
        named("inCitationsCount", Accumulator::Sum(field("inCitationsCount"))),
        named("yearPublishedFirst", Accumulator::Min(field("yearPublished"))),
        named("yearPublishedLast", Accumulator::Max(field("yearPublished"))),
    ];
    if let Some(label) = dim.label {
        fields.push(named("label", Accumulator::First(field(label))));
    }
    Stage::Group {
        id: field(dim.field),
        fields,
    }
}

fn info_projection(dim: &Dimension) -> Stage {
    let mut fields = vec![
        ("_id".to_string(), Projection::Exclude),
        computed(
            KEY_FIELD,
            Expr::IfNull(Box::new(field("_id")), Box::new(Expr::literal(dim.sentinel))),
        ),
    ];
    if dim.label.is_some() {
        fields.push(computed("label", field("label")));
    }
    for name in [
        "papersCount",
        "inCitationsCount",
        "yearPublishedFirst",
        "yearPublishedLast",
    ] {
        fields.push(computed(name, field(name)));
    }
    fields.push(computed(
        "inCitationsPerPaper",
        Expr::Divide(
            Box::new(field("inCitationsCount")),
            Box::new(field("papersCount")),
        ),
    ));
    Stage::Project(fields)
}

/// Row and row-count pipelines of the info view
///
/// The sort slot always holds a stage: the requested `$sort` (with the
/// group key as secondary key) or `$skip: 0`. The page skip follows it.
pub fn info(
    dim: &Dimension,
    filter: &MatchExpr,
    sort: Option<&SortSpec>,
    paging: Paging,
) -> (Pipeline, Pipeline) {
    let rows = Pipeline::new()
        .stage(Stage::Match(filter.clone()))
        .maybe_stage(unwind(dim, true))
        .stage(info_group(dim))
        .stage(info_projection(dim))
        .stage(compile_sort(sort, Some(KEY_FIELD)))
        .stage(Stage::Skip(paging.offset()))
        .stage(Stage::Limit(paging.page_size));

    let count = Pipeline::new()
        .stage(Stage::Match(filter.clone()))
        .maybe_stage(unwind(dim, true))
        .stage(Stage::Group {
            id: field(dim.field),
            fields: Vec::new(),
        })
        .stage(Stage::Count(ROW_COUNT_FIELD.to_string()));

    (rows, count)
}

// =============================================================================
// quartiles / topk
// =============================================================================

fn metric_groups(dim: &Dimension, filter: &MatchExpr, metric: Metric) -> Pipeline {
    let value = match metric.source_field() {
        Some(source) => Accumulator::Sum(field(source)),
        None => Accumulator::Sum(Expr::literal(1)),
    };
    let mut fields = vec![named(VALUE_FIELD, value)];
    if let Some(label) = dim.label {
        fields.push(named("label", Accumulator::First(field(label))));
    }
    Pipeline::new()
        .stage(Stage::Match(filter.clone()))
        .maybe_stage(unwind_present(dim))
        .stage(Stage::Group {
            id: field(dim.field),
            fields,
        })
}

/// Per-group metric values, ascending (ties by group key)
pub fn quartiles(dim: &Dimension, filter: &MatchExpr, metric: Metric) -> Pipeline {
    metric_groups(dim, filter, metric).stage(Stage::Sort(vec![
        (VALUE_FIELD.to_string(), Direction::Asc),
        ("_id".to_string(), Direction::Asc),
    ]))
}

/// Top `k` groups by metric as `{x, y}` points
pub fn topk(dim: &Dimension, filter: &MatchExpr, metric: Metric, k: u64) -> Pipeline {
    let x = match dim.label {
        Some(_) => Expr::IfNull(Box::new(field("label")), Box::new(field("_id"))),
        None => field("_id"),
    };
    metric_groups(dim, filter, metric)
        .stage(Stage::Sort(vec![
            (VALUE_FIELD.to_string(), Direction::Desc),
            ("_id".to_string(), Direction::Asc),
        ]))
        .stage(Stage::Limit(k))
        .stage(Stage::Project(vec![
            ("_id".to_string(), Projection::Exclude),
            computed("x", x),
            computed("y", field(VALUE_FIELD)),
        ]))
}

// =============================================================================
// list
// =============================================================================

/// Store request serving a typeahead list
#[derive(Debug, Clone, PartialEq)]
pub enum ListQuery {
    /// Filtered projection over a collection
    Find {
        /// Collection searched
        collection: &'static str,
        /// Text column matched and returned
        column: &'static str,
        /// The lookup
        query: FindQuery,
    },
    /// Distinct matching values of a paper field
    Distinct {
        /// Collection aggregated
        collection: &'static str,
        /// The pipeline, emitting `{_id: value}`
        pipeline: Pipeline,
    },
}

/// Case-insensitive substring lookup on `column`
///
/// `pattern` is matched literally. `limit == 0` leaves the list unbounded.
/// Returns `None` when the dimension has no list source.
pub fn list(dim: &Dimension, column: &'static str, pattern: &str, limit: u64) -> Option<ListQuery> {
    let condition = Condition::Pattern(regex::escape(pattern));
    let limit = (limit > 0).then_some(limit);

    match dim.list? {
        ListSource::Collection { collection, .. } => Some(ListQuery::Find {
            collection,
            column,
            query: FindQuery {
                filter: MatchExpr::all().with(Clause::new(column, condition)),
                projection: vec![column.to_string()],
                sort: vec![(column.to_string(), Direction::Asc)],
                limit,
            },
        }),
        ListSource::Values => {
            let pipeline = Pipeline::new()
                .maybe_stage(unwind_present(dim))
                .stage(Stage::Match(
                    MatchExpr::all().with(Clause::new(column, condition)),
                ))
                .stage(Stage::Group {
                    id: field(column),
                    fields: Vec::new(),
                })
                .stage(Stage::Sort(vec![("_id".to_string(), Direction::Asc)]))
                .maybe_stage(limit.map(Stage::Limit));
            Some(ListQuery::Distinct {
                collection: PAPERS,
                pipeline,
            })
        },
    }
}
