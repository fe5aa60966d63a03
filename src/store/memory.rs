//! In-memory document store
//!
//! Evaluates the full stage repertoire of [`Pipeline`] over JSON documents
//! held in process memory. Used by the development server (seeded from a
//! JSON file) and by every test suite.
//!
//! # Semantics
//!
//! The evaluator mirrors the production store where the analytics views
//! depend on it:
//!
//! - `$in` and equality against an array field match when any element
//!   matches; a missing field matches only `null`.
//! - `$unwind` on a scalar passes the document through; null, missing and
//!   empty arrays are dropped unless `preserve_null` is set.
//! - `$sum` ignores non-numeric values; `$min`/`$max` ignore nulls.
//! - `$count` over an empty stream emits no document.
//! - Groups are emitted in first-seen order.
//!
//! # Seed format
//!
//! ```json
//! {"papers": [{"_id": "...", "title": "..."}], "authors": [], "venues": []}
//! ```

use crate::error::{Error, Result, StoreError};
use crate::query::ast::{
    Accumulator, Condition, Direction, Document, Expr, FindQuery, MatchExpr, Pipeline, Projection,
    Stage,
};
use crate::store::value::{self, assign, compare, compare_opt, equal, group_key, resolve};
use crate::store::DocumentStore;
use crate::types::Bounds;
use async_trait::async_trait;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tracing::{debug, info};

// =============================================================================
// InMemoryStore
// =============================================================================

/// Process-local document store
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    queries: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a seed file
    pub fn from_seed_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let seed: Value = serde_json::from_str(&raw)?;
        let store = Self::from_seed(seed)?;
        info!(
            path = %path.display(),
            collections = store.collections.read().len(),
            "Loaded seed data"
        );
        Ok(store)
    }

    /// Build a store from a seed value (`{collection: [documents]}`)
    pub fn from_seed(seed: Value) -> Result<Self> {
        let Value::Object(collections) = seed else {
            return Err(Error::Store(StoreError::InvalidDocument(
                "seed must be an object of collections".to_string(),
            )));
        };

        let store = Self::new();
        for (name, docs) in collections {
            let Value::Array(docs) = docs else {
                return Err(Error::Store(StoreError::InvalidDocument(format!(
                    "collection '{}' must be an array",
                    name
                ))));
            };
            let docs = docs
                .into_iter()
                .map(|doc| match doc {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::InvalidDocument(format!(
                        "collection '{}' contains a non-object: {}",
                        name, other
                    ))),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            store.insert(&name, docs);
        }
        Ok(store)
    }

    /// Append documents to a collection
    pub fn insert(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// True when the collection holds no documents
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Aggregate and find calls served so far
    pub fn query_count(&self) -> u64 {
        self.queries.load(AtomicOrdering::Relaxed)
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn engine_id(&self) -> &str {
        "memory"
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> std::result::Result<Vec<Document>, StoreError> {
        self.queries.fetch_add(1, AtomicOrdering::Relaxed);
        let docs = self.snapshot(collection);
        debug!(collection, input = docs.len(), stages = pipeline.len(), "Evaluating pipeline");
        run_pipeline(docs, pipeline)
    }

    async fn find(
        &self,
        collection: &str,
        query: &FindQuery,
    ) -> std::result::Result<Vec<Document>, StoreError> {
        self.queries.fetch_add(1, AtomicOrdering::Relaxed);
        let matcher = Matcher::compile(&query.filter)?;
        let mut docs: Vec<Document> = self
            .snapshot(collection)
            .into_iter()
            .filter(|doc| matcher.matches(doc))
            .collect();
        sort_documents(&mut docs, &query.sort);
        if let Some(limit) = query.limit {
            docs.truncate(to_usize(limit));
        }
        Ok(docs
            .iter()
            .map(|doc| {
                let mut out = Map::new();
                if let Some(id) = doc.get("_id") {
                    out.insert("_id".to_string(), id.clone());
                }
                for field in &query.projection {
                    if let Some(v) = resolve(doc, field) {
                        assign(&mut out, field, v.clone());
                    }
                }
                out
            })
            .collect())
    }

    async fn ping(&self) -> std::result::Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// Pipeline evaluation
// =============================================================================

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// Evaluate a pipeline over a document stream
pub fn run_pipeline(
    mut docs: Vec<Document>,
    pipeline: &Pipeline,
) -> std::result::Result<Vec<Document>, StoreError> {
    for stage in pipeline.stages() {
        docs = apply_stage(docs, stage)?;
    }
    Ok(docs)
}

fn apply_stage(
    docs: Vec<Document>,
    stage: &Stage,
) -> std::result::Result<Vec<Document>, StoreError> {
    match stage {
        Stage::Match(expr) => {
            let matcher = Matcher::compile(expr)?;
            Ok(docs.into_iter().filter(|d| matcher.matches(d)).collect())
        },
        Stage::Unwind {
            path,
            preserve_null,
        } => Ok(unwind(docs, path, *preserve_null)),
        Stage::Group { id, fields } => group(docs, id, fields),
        Stage::Project(fields) => docs.iter().map(|d| project(d, fields)).collect(),
        Stage::Sort(keys) => {
            let mut docs = docs;
            sort_documents(&mut docs, keys);
            Ok(docs)
        },
        Stage::Skip(n) => Ok(docs.into_iter().skip(to_usize(*n)).collect()),
        Stage::Limit(n) => Ok(docs.into_iter().take(to_usize(*n)).collect()),
        Stage::Count(name) => {
            if docs.is_empty() {
                return Ok(Vec::new());
            }
            let mut out = Map::new();
            out.insert(name.clone(), json!(docs.len()));
            Ok(vec![out])
        },
    }
}

// -----------------------------------------------------------------------------
// Match
// -----------------------------------------------------------------------------

enum Test<'a> {
    Range(Bounds),
    In(&'a [Value]),
    Eq(&'a Value),
    Pattern(Regex),
}

struct Matcher<'a> {
    clauses: Vec<(&'a str, Test<'a>)>,
}

impl<'a> Matcher<'a> {
    fn compile(expr: &'a MatchExpr) -> std::result::Result<Self, StoreError> {
        let clauses = expr
            .clauses
            .iter()
            .map(|clause| {
                let test = match &clause.condition {
                    Condition::Range(bounds) => Test::Range(*bounds),
                    Condition::In(values) => Test::In(values.as_slice()),
                    Condition::Eq(value) => Test::Eq(value),
                    Condition::Pattern(pattern) => Test::Pattern(
                        RegexBuilder::new(pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| StoreError::QueryFailed(e.to_string()))?,
                    ),
                };
                Ok((clause.field.as_str(), test))
            })
            .collect::<std::result::Result<Vec<_>, StoreError>>()?;
        Ok(Self { clauses })
    }

    fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, test)| test.accepts(resolve(doc, field)))
    }
}

/// Scalar candidates of a field: its elements when it is an array
fn candidates(v: Option<&Value>) -> Vec<&Value> {
    match v {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

impl Test<'_> {
    fn accepts(&self, v: Option<&Value>) -> bool {
        match self {
            Test::Range(bounds) => candidates(v).into_iter().any(|x| {
                value::as_number(x).is_some_and(|n| {
                    bounds.gte.map_or(true, |g| n >= g as f64)
                        && bounds.lte.map_or(true, |l| n <= l as f64)
                })
            }),
            Test::In(values) => match v {
                None => values.iter().any(Value::is_null),
                Some(field) => {
                    values.iter().any(|x| equal(field, x))
                        || candidates(Some(field))
                            .into_iter()
                            .any(|item| values.iter().any(|x| equal(item, x)))
                },
            },
            Test::Eq(target) => match v {
                None => target.is_null(),
                Some(field) => {
                    equal(field, target)
                        || candidates(Some(field))
                            .into_iter()
                            .any(|item| equal(item, target))
                },
            },
            Test::Pattern(re) => candidates(v)
                .into_iter()
                .any(|x| x.as_str().is_some_and(|s| re.is_match(s))),
        }
    }
}

// -----------------------------------------------------------------------------
// Unwind
// -----------------------------------------------------------------------------

fn unwind(docs: Vec<Document>, path: &str, preserve_null: bool) -> Vec<Document> {
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match resolve(&doc, path).cloned() {
            Some(Value::Array(items)) if !items.is_empty() => {
                for item in items {
                    let mut expanded = doc.clone();
                    assign(&mut expanded, path, item);
                    out.push(expanded);
                }
            },
            Some(Value::Array(_)) => {
                if preserve_null {
                    let mut kept = doc;
                    value::remove(&mut kept, path);
                    out.push(kept);
                }
            },
            None | Some(Value::Null) => {
                if preserve_null {
                    out.push(doc);
                }
            },
            Some(_) => out.push(doc),
        }
    }
    out
}

// -----------------------------------------------------------------------------
// Expressions
// -----------------------------------------------------------------------------

fn eval(expr: &Expr, doc: &Document) -> std::result::Result<Option<Value>, StoreError> {
    match expr {
        Expr::Field(path) => Ok(resolve(doc, path).cloned()),
        Expr::Literal(v) => Ok(Some(v.clone())),
        Expr::Size(inner) => match eval(inner, doc)? {
            Some(Value::Array(items)) => Ok(Some(json!(items.len()))),
            other => Err(StoreError::QueryFailed(format!(
                "$size requires an array, found {}",
                other.unwrap_or(Value::Null)
            ))),
        },
        Expr::Divide(num, den) => {
            let (num, den) = (eval(num, doc)?, eval(den, doc)?);
            let (Some(num), Some(den)) = (num, den) else {
                return Ok(Some(Value::Null));
            };
            if num.is_null() || den.is_null() {
                return Ok(Some(Value::Null));
            }
            match (num.as_f64(), den.as_f64()) {
                (Some(_), Some(d)) if d == 0.0 => {
                    Err(StoreError::QueryFailed("can't $divide by zero".to_string()))
                },
                (Some(n), Some(d)) => Ok(Some(json!(n / d))),
                _ => Err(StoreError::QueryFailed(format!(
                    "$divide only supports numeric types, found {} and {}",
                    num, den
                ))),
            }
        },
        Expr::IfNull(first, fallback) => match eval(first, doc)? {
            Some(v) if !v.is_null() => Ok(Some(v)),
            _ => eval(fallback, doc),
        },
    }
}

// -----------------------------------------------------------------------------
// Group
// -----------------------------------------------------------------------------

enum AccState {
    Sum { int: i64, float: f64, is_float: bool },
    Min(Option<Value>),
    Max(Option<Value>),
    First(Option<Value>),
    Set(Vec<Value>),
    Push(Vec<Value>),
}

impl AccState {
    fn new(acc: &Accumulator) -> Self {
        match acc {
            Accumulator::Sum(_) => AccState::Sum {
                int: 0,
                float: 0.0,
                is_float: false,
            },
            Accumulator::Min(_) => AccState::Min(None),
            Accumulator::Max(_) => AccState::Max(None),
            Accumulator::First(_) => AccState::First(None),
            Accumulator::AddToSet(_) => AccState::Set(Vec::new()),
            Accumulator::Push(_) => AccState::Push(Vec::new()),
        }
    }

    fn feed(&mut self, v: Option<Value>) {
        match self {
            AccState::Sum {
                int,
                float,
                is_float,
            } => {
                let Some(Value::Number(n)) = v else { return };
                match n.as_i64().and_then(|i| int.checked_add(i)) {
                    Some(sum) if !*is_float => *int = sum,
                    _ => {
                        *is_float = true;
                        *float += n.as_f64().unwrap_or(0.0);
                    },
                }
            },
            AccState::Min(current) => keep_extreme(current, v, Ordering::Less),
            AccState::Max(current) => keep_extreme(current, v, Ordering::Greater),
            AccState::First(current) => {
                if current.is_none() {
                    *current = Some(v.unwrap_or(Value::Null));
                }
            },
            AccState::Set(values) => {
                if let Some(v) = v {
                    if !values.iter().any(|x| equal(x, &v)) {
                        values.push(v);
                    }
                }
            },
            AccState::Push(values) => {
                if let Some(v) = v {
                    values.push(v);
                }
            },
        }
    }

    fn finish(self) -> Value {
        match self {
            AccState::Sum {
                int,
                float,
                is_float,
            } => {
                if is_float {
                    json!(int as f64 + float)
                } else {
                    json!(int)
                }
            },
            AccState::Min(v) | AccState::Max(v) | AccState::First(v) => v.unwrap_or(Value::Null),
            AccState::Set(values) | AccState::Push(values) => Value::Array(values),
        }
    }
}

fn keep_extreme(current: &mut Option<Value>, v: Option<Value>, wants: Ordering) {
    let Some(v) = v.filter(|v| !v.is_null()) else {
        return;
    };
    if current.as_ref().map_or(true, |c| compare(&v, c) == wants) {
        *current = Some(v);
    }
}

fn group(
    docs: Vec<Document>,
    id: &Expr,
    fields: &[(String, Accumulator)],
) -> std::result::Result<Vec<Document>, StoreError> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<AccState>)> = Vec::new();

    for doc in &docs {
        let key = eval(id, doc)?.unwrap_or(Value::Null);
        let slot = match index.get(&group_key(&key)) {
            Some(&slot) => slot,
            None => {
                index.insert(group_key(&key), groups.len());
                groups.push((key, fields.iter().map(|(_, acc)| AccState::new(acc)).collect()));
                groups.len() - 1
            },
        };
        for ((_, acc), state) in fields.iter().zip(groups[slot].1.iter_mut()) {
            let input = match acc {
                Accumulator::Sum(e)
                | Accumulator::Min(e)
                | Accumulator::Max(e)
                | Accumulator::First(e)
                | Accumulator::AddToSet(e)
                | Accumulator::Push(e) => eval(e, doc)?,
            };
            state.feed(input);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for ((name, _), state) in fields.iter().zip(states) {
                out.insert(name.clone(), state.finish());
            }
            out
        })
        .collect())
}

// -----------------------------------------------------------------------------
// Project and Sort
// -----------------------------------------------------------------------------

fn project(
    doc: &Document,
    fields: &[(String, Projection)],
) -> std::result::Result<Document, StoreError> {
    let mut out = Map::new();
    let id_listed = fields.iter().any(|(name, _)| name == "_id");
    if !id_listed {
        if let Some(id) = doc.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }
    for (name, projection) in fields {
        match projection {
            Projection::Exclude => {},
            Projection::Compute(expr) => {
                if let Some(v) = eval(expr, doc)? {
                    assign(&mut out, name, v);
                }
            },
        }
    }
    Ok(out)
}

fn sort_documents(docs: &mut [Document], keys: &[(String, Direction)]) {
    if keys.is_empty() {
        return;
    }
    docs.sort_by(|a, b| {
        keys.iter().fold(Ordering::Equal, |ord, (field, direction)| {
            ord.then_with(|| {
                let o = compare_opt(resolve(a, field), resolve(b, field));
                match direction {
                    Direction::Asc => o,
                    Direction::Desc => o.reverse(),
                }
            })
        })
    });
}
