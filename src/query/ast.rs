//! Aggregation Pipeline Abstract Syntax Tree (AST)
//!
//! Typed representation of the stages the analytics engine sends to the
//! document store. Every node renders to the store's native JSON dialect
//! via `to_native()`, which is what gets logged and what a native backend
//! would receive.
//!
//! # Stage Repertoire
//!
//! - **Match**: ANDed field clauses (range, membership, equality, pattern)
//! - **Unwind**: one document per element of an array field
//! - **Group**: group by an expression with accumulators
//! - **Project**: computed output fields
//! - **Sort / Skip / Limit**: ordering and pagination
//! - **Count**: replace the stream with a single count document
//!
//! # Example
//!
//! ```rust
//! use scholar_analytics::query::ast::{Accumulator, Direction, Expr, Pipeline, Stage};
//!
//! let pipeline = Pipeline::new()
//!     .stage(Stage::Group {
//!         id: Expr::field("publisher"),
//!         fields: vec![("value".to_string(), Accumulator::Sum(Expr::literal(1)))],
//!     })
//!     .stage(Stage::Sort(vec![("value".to_string(), Direction::Desc)]))
//!     .stage(Stage::Limit(10));
//!
//! assert_eq!(pipeline.len(), 3);
//! ```

use crate::types::Bounds;
use serde_json::{json, Map, Value};

/// A stored document
pub type Document = Map<String, Value>;

// ============================================================================
// Ordering
// ============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending (1)
    Asc,
    /// Descending (-1)
    Desc,
}

impl Direction {
    /// Native numeric form
    pub fn as_i32(&self) -> i32 {
        match self {
            Direction::Asc => 1,
            Direction::Desc => -1,
        }
    }
}

// ============================================================================
// Match Expressions
// ============================================================================

/// Condition applied to a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Inclusive numeric range
    Range(Bounds),
    /// Field (or any element of an array field) is one of the values
    In(Vec<Value>),
    /// Field equals the value
    Eq(Value),
    /// Case-insensitive regular expression on a text field
    Pattern(String),
}

/// One field clause of a match expression
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Dotted field path
    pub field: String,
    /// Condition on the field
    pub condition: Condition,
}

impl Clause {
    /// Create a clause
    pub fn new(field: impl Into<String>, condition: Condition) -> Self {
        Self {
            field: field.into(),
            condition,
        }
    }

    fn to_native(&self) -> Value {
        match &self.condition {
            Condition::Range(bounds) => {
                let mut ops = Map::new();
                if let Some(gte) = bounds.gte {
                    ops.insert("$gte".to_string(), json!(gte));
                }
                if let Some(lte) = bounds.lte {
                    ops.insert("$lte".to_string(), json!(lte));
                }
                Value::Object(ops)
            },
            Condition::In(values) => json!({ "$in": values }),
            Condition::Eq(value) => value.clone(),
            Condition::Pattern(pattern) => json!({ "$regex": pattern, "$options": "i" }),
        }
    }
}

/// Conjunction of field clauses
///
/// An empty expression matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchExpr {
    /// Clauses, implicitly ANDed
    pub clauses: Vec<Clause>,
}

impl MatchExpr {
    /// Expression matching everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a clause
    pub fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// True when no clause is present
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Native `{field: condition, ...}` form
    pub fn to_native(&self) -> Value {
        let mut doc = Map::new();
        for clause in &self.clauses {
            doc.insert(clause.field.clone(), clause.to_native());
        }
        Value::Object(doc)
    }
}

// ============================================================================
// Expressions and Accumulators
// ============================================================================

/// Value expression evaluated per document
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field reference (`$path`)
    Field(String),
    /// Constant
    Literal(Value),
    /// Length of an array
    Size(Box<Expr>),
    /// Numeric division
    Divide(Box<Expr>, Box<Expr>),
    /// First expression unless null or missing, else the second
    IfNull(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Field reference
    pub fn field(path: impl Into<String>) -> Self {
        Expr::Field(path.into())
    }

    /// Constant value
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Native form
    pub fn to_native(&self) -> Value {
        match self {
            Expr::Field(path) => Value::String(format!("${}", path)),
            Expr::Literal(value) => value.clone(),
            Expr::Size(inner) => json!({ "$size": inner.to_native() }),
            Expr::Divide(a, b) => json!({ "$divide": [a.to_native(), b.to_native()] }),
            Expr::IfNull(a, b) => json!({ "$ifNull": [a.to_native(), b.to_native()] }),
        }
    }
}

/// Group accumulator
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Numeric sum
    Sum(Expr),
    /// Minimum value
    Min(Expr),
    /// Maximum value
    Max(Expr),
    /// Value from the first document of the group
    First(Expr),
    /// Distinct values
    AddToSet(Expr),
    /// All values in input order
    Push(Expr),
}

impl Accumulator {
    /// Native form
    pub fn to_native(&self) -> Value {
        match self {
            Accumulator::Sum(e) => json!({ "$sum": e.to_native() }),
            Accumulator::Min(e) => json!({ "$min": e.to_native() }),
            Accumulator::Max(e) => json!({ "$max": e.to_native() }),
            Accumulator::First(e) => json!({ "$first": e.to_native() }),
            Accumulator::AddToSet(e) => json!({ "$addToSet": e.to_native() }),
            Accumulator::Push(e) => json!({ "$push": e.to_native() }),
        }
    }
}

/// Output field of a projection
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Drop the field (only meaningful for `_id`)
    Exclude,
    /// Computed value
    Compute(Expr),
}

// ============================================================================
// Stages
// ============================================================================

/// One pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Filter documents
    Match(MatchExpr),
    /// Expand an array field
    Unwind {
        /// Field path to expand
        path: String,
        /// Keep documents whose field is null, missing or empty
        preserve_null: bool,
    },
    /// Group by `id`, computing `fields`
    Group {
        /// Grouping expression (`null` groups everything together)
        id: Expr,
        /// Output field name and accumulator
        fields: Vec<(String, Accumulator)>,
    },
    /// Reshape documents
    Project(Vec<(String, Projection)>),
    /// Order documents by the listed keys
    Sort(Vec<(String, Direction)>),
    /// Drop the first N documents
    Skip(u64),
    /// Keep at most N documents
    Limit(u64),
    /// Emit `{name: count}`
    Count(String),
}

impl Stage {
    /// Stage name as used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Unwind { .. } => "unwind",
            Stage::Group { .. } => "group",
            Stage::Project(_) => "project",
            Stage::Sort(_) => "sort",
            Stage::Skip(_) => "skip",
            Stage::Limit(_) => "limit",
            Stage::Count(_) => "count",
        }
    }

    /// Native `{"$stage": ...}` form
    pub fn to_native(&self) -> Value {
        match self {
            Stage::Match(expr) => json!({ "$match": expr.to_native() }),
            Stage::Unwind {
                path,
                preserve_null,
            } => {
                if *preserve_null {
                    json!({ "$unwind": {
                        "path": format!("${}", path),
                        "preserveNullAndEmptyArrays": true
                    }})
                } else {
                    json!({ "$unwind": format!("${}", path) })
                }
            },
            Stage::Group { id, fields } => {
                let mut doc = Map::new();
                doc.insert("_id".to_string(), id.to_native());
                for (name, acc) in fields {
                    doc.insert(name.clone(), acc.to_native());
                }
                json!({ "$group": doc })
            },
            Stage::Project(fields) => {
                let mut doc = Map::new();
                for (name, projection) in fields {
                    let value = match projection {
                        Projection::Exclude => json!(0),
                        Projection::Compute(expr) => expr.to_native(),
                    };
                    doc.insert(name.clone(), value);
                }
                json!({ "$project": doc })
            },
            Stage::Sort(keys) => {
                let mut doc = Map::new();
                for (field, direction) in keys {
                    doc.insert(field.clone(), json!(direction.as_i32()));
                }
                json!({ "$sort": doc })
            },
            Stage::Skip(n) => json!({ "$skip": n }),
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Count(name) => json!({ "$count": name }),
        }
    }
}

/// Ordered list of stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a stage when present
    pub fn maybe_stage(self, stage: Option<Stage>) -> Self {
        match stage {
            Some(stage) => self.stage(stage),
            None => self,
        }
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when there are no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Native array form
    pub fn to_native(&self) -> Value {
        Value::Array(self.stages.iter().map(Stage::to_native).collect())
    }
}

/// Filtered projection for simple lookups that need no aggregation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    /// Document filter
    pub filter: MatchExpr,
    /// Fields to return (`_id` is always returned)
    pub projection: Vec<String>,
    /// Ordering
    pub sort: Vec<(String, Direction)>,
    /// Maximum documents
    pub limit: Option<u64>,
}
