//! FilterSpec to store-native match compilation
//!
//! Each populated predicate becomes exactly one clause; absent predicates
//! contribute nothing, so an empty filter compiles to the empty match.
//!
//! | Predicate        | Field              | Clause  |
//! |------------------|--------------------|---------|
//! | `year_range`     | `yearPublished`    | range   |
//! | `author_ids`     | `authors`          | `$in`   |
//! | `venue_ids`      | `venue`            | `$in`   |
//! | `open_access`    | `isOpenAccess`     | eq      |
//! | `types_of_paper` | `typeOfPaper`      | `$in`   |
//! | `fields_of_study`| `fieldsOfStudy`    | `$in`   |
//! | `publishers`     | `publisher`        | `$in`   |
//! | `citation_range` | `inCitationsCount` | range   |

use crate::query::ast::{Clause, Condition, Direction, MatchExpr, Stage};
use crate::query::params::{FilterSpec, SortSpec};
use serde_json::Value;
use std::collections::BTreeSet;

/// Compile a filter into a match expression
pub fn compile(filter: &FilterSpec) -> MatchExpr {
    let mut expr = MatchExpr::all();

    if let Some(bounds) = filter.year_range {
        expr = expr.with(Clause::new("yearPublished", Condition::Range(bounds)));
    }
    if let Some(ids) = &filter.author_ids {
        expr = expr.with(membership("authors", ids.iter().map(|id| id.as_str())));
    }
    if let Some(ids) = &filter.venue_ids {
        expr = expr.with(membership("venue", ids.iter().map(|id| id.as_str())));
    }
    if let Some(open) = filter.open_access {
        expr = expr.with(Clause::new("isOpenAccess", Condition::Eq(Value::Bool(open))));
    }
    if let Some(types) = &filter.types_of_paper {
        expr = expr.with(string_membership("typeOfPaper", types));
    }
    if let Some(fields) = &filter.fields_of_study {
        expr = expr.with(string_membership("fieldsOfStudy", fields));
    }
    if let Some(publishers) = &filter.publishers {
        expr = expr.with(string_membership("publisher", publishers));
    }
    if let Some(bounds) = filter.citation_range {
        expr = expr.with(Clause::new("inCitationsCount", Condition::Range(bounds)));
    }

    expr
}

fn membership<'a>(field: &str, values: impl Iterator<Item = &'a str>) -> Clause {
    Clause::new(
        field,
        Condition::In(values.map(|v| Value::String(v.to_string())).collect()),
    )
}

fn string_membership(field: &str, values: &BTreeSet<String>) -> Clause {
    membership(field, values.iter().map(String::as_str))
}

/// Compile the explicit ordering of the info view
///
/// Without a sort the slot still carries a stage: `$skip: 0`.
/// `tie_break` is appended as an ascending secondary key so paging is
/// deterministic across equal primary values.
pub fn compile_sort(sort: Option<&SortSpec>, tie_break: Option<&str>) -> Stage {
    match sort {
        Some(spec) => {
            let mut keys = vec![(spec.field.clone(), spec.direction)];
            if let Some(key) = tie_break.filter(|k| *k != spec.field) {
                keys.push((key.to_string(), Direction::Asc));
            }
            Stage::Sort(keys)
        },
        None => Stage::Skip(0),
    }
}
