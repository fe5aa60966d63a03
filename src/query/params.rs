//! Request parameter parsing
//!
//! Turns the raw query-string map of an analytics request into typed
//! values. Filter predicates are parsed eagerly into a [`FilterSpec`];
//! view-specific parameters (`page`, `k`, `metric`, ...) are kept as raw
//! text and validated by the `require_*` accessors, so a malformed `page`
//! only fails the views that actually need it.
//!
//! # Parsing rules
//!
//! - Integer predicates (`yearStart`, `yearEnd`, `citationsMin`,
//!   `citationsMax`) read their leading integer (`"2020abc"` is 2020);
//!   absent or non-numeric values impose no constraint.
//! - Array predicates are JSON-encoded string arrays; malformed JSON is a
//!   [`ParameterError`]. An empty array imposes no constraint.
//! - `openAccess` is true only for the literal `"true"`; an empty value
//!   imposes no constraint.
//! - Unknown parameters are ignored.

use crate::error::ParameterError;
use crate::query::ast::Direction;
use crate::types::{Bounds, Metric, RefId};
use std::collections::{BTreeSet, HashMap};

/// Query string as received from the HTTP layer
pub type RawParams = HashMap<String, String>;

// ============================================================================
// FilterSpec
// ============================================================================

/// Normalized filter predicates of one request
///
/// Every field is independently optional; `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    /// Publication year bounds
    pub year_range: Option<Bounds>,
    /// Papers with any of these authors
    pub author_ids: Option<BTreeSet<RefId>>,
    /// Papers in any of these venues
    pub venue_ids: Option<BTreeSet<RefId>>,
    /// Open access flag
    pub open_access: Option<bool>,
    /// Paper types
    pub types_of_paper: Option<BTreeSet<String>>,
    /// Fields of study
    pub fields_of_study: Option<BTreeSet<String>>,
    /// Publisher names
    pub publishers: Option<BTreeSet<String>>,
    /// Incoming citation count bounds
    pub citation_range: Option<Bounds>,
}

impl FilterSpec {
    /// Build a filter from raw query parameters
    pub fn from_params(params: &RawParams) -> Result<Self, ParameterError> {
        let year_range = bounds(params, "yearStart", "yearEnd");
        let citation_range = bounds(params, "citationsMin", "citationsMax");

        let author_ids = ref_id_set(params, "authorIds")?;
        let venue_ids = ref_id_set(params, "venueIds")?;
        let types_of_paper = string_set(params, "typesOfPaper")?;
        let fields_of_study = string_set(params, "fieldsOfStudy")?;
        let publishers = string_set(params, "publishers")?;

        let open_access = params
            .get("openAccess")
            .filter(|raw| !raw.is_empty())
            .map(|raw| raw == "true");

        Ok(Self {
            year_range,
            author_ids,
            venue_ids,
            open_access,
            types_of_paper,
            fields_of_study,
            publishers,
            citation_range,
        })
    }

    /// True when no predicate is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Requested lower year bound
    pub fn year_start(&self) -> Option<i64> {
        self.year_range.and_then(|b| b.gte)
    }

    /// Requested upper year bound
    pub fn year_end(&self) -> Option<i64> {
        self.year_range.and_then(|b| b.lte)
    }
}

/// Lenient integer parse of the leading `[+-]?digits` prefix
///
/// `"2020abc"` and `"2020.5"` read as 2020; input without a leading
/// integer yields `None`.
fn parse_int(raw: Option<&String>) -> Option<i64> {
    let s = raw?.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value = rest[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn bounds(params: &RawParams, low: &str, high: &str) -> Option<Bounds> {
    let b = Bounds {
        gte: parse_int(params.get(low)),
        lte: parse_int(params.get(high)),
    };
    (!b.is_unbounded()).then_some(b)
}

fn json_array(params: &RawParams, key: &str) -> Result<Option<Vec<String>>, ParameterError> {
    let Some(raw) = params.get(key) else {
        return Ok(None);
    };
    let values: Vec<String> = serde_json::from_str(raw)
        .map_err(|e| ParameterError::invalid(key, format!("expected JSON string array: {}", e)))?;
    Ok((!values.is_empty()).then_some(values))
}

fn string_set(params: &RawParams, key: &str) -> Result<Option<BTreeSet<String>>, ParameterError> {
    Ok(json_array(params, key)?.map(|values| values.into_iter().collect()))
}

fn ref_id_set(params: &RawParams, key: &str) -> Result<Option<BTreeSet<RefId>>, ParameterError> {
    let Some(values) = json_array(params, key)? else {
        return Ok(None);
    };
    values
        .iter()
        .map(|v| RefId::parse(v).map_err(|msg| ParameterError::invalid(key, msg)))
        .collect::<Result<BTreeSet<_>, _>>()
        .map(Some)
}

// ============================================================================
// SortSpec
// ============================================================================

/// Explicit ordering of the info table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Row field to sort on
    pub field: String,
    /// Sort direction
    pub direction: Direction,
}

impl SortSpec {
    /// Both `sortField` and `sortDirection` must be present
    ///
    /// `"asc"` sorts ascending; any other direction sorts descending.
    pub fn from_params(params: &RawParams) -> Option<Self> {
        let field = params.get("sortField")?;
        let direction = params.get("sortDirection")?;
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.clone(),
            direction: if direction == "asc" {
                Direction::Asc
            } else {
                Direction::Desc
            },
        })
    }
}

// ============================================================================
// Request
// ============================================================================

/// Page coordinates of the info view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Zero-based page index
    pub page: u64,
    /// Rows per page
    pub page_size: u64,
}

impl Paging {
    /// Rows to skip before the page
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.page_size)
    }
}

/// Typed view of one analytics request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsRequest {
    /// Filter predicates
    pub filter: FilterSpec,
    /// Explicit ordering
    pub sort: Option<SortSpec>,
    page: Option<String>,
    page_size: Option<String>,
    metric: Option<String>,
    k: Option<String>,
    pattern: Option<String>,
    column: Option<String>,
}

impl AnalyticsRequest {
    /// Parse a request; fails only on malformed filter arrays
    pub fn parse(params: &RawParams) -> Result<Self, ParameterError> {
        Ok(Self {
            filter: FilterSpec::from_params(params)?,
            sort: SortSpec::from_params(params),
            page: params.get("page").cloned(),
            page_size: params.get("pageSize").cloned(),
            metric: params.get("metric").cloned(),
            k: params.get("k").cloned(),
            pattern: params.get("pattern").cloned(),
            column: params.get("column").cloned(),
        })
    }

    /// `page` and `pageSize`, both required
    pub fn require_paging(&self) -> Result<Paging, ParameterError> {
        let page = required_uint("page", self.page.as_deref(), 0)?;
        let page_size = required_uint("pageSize", self.page_size.as_deref(), 1)?;
        Ok(Paging { page, page_size })
    }

    /// `metric`, required and one of the known metrics
    pub fn require_metric(&self) -> Result<Metric, ParameterError> {
        let raw = self
            .metric
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ParameterError::MissingField("metric".to_string()))?;
        Metric::parse(raw).ok_or_else(|| ParameterError::unsupported("metric", raw))
    }

    /// `metric`, falling back to `default` when absent
    ///
    /// Without a default this is [`require_metric`](Self::require_metric).
    /// An unknown metric is rejected either way.
    pub fn metric_or(&self, default: Option<Metric>) -> Result<Metric, ParameterError> {
        match (self.metric.as_deref().filter(|m| !m.is_empty()), default) {
            (None, Some(metric)) => Ok(metric),
            _ => self.require_metric(),
        }
    }

    /// `k`, a positive integer
    pub fn require_k(&self) -> Result<u64, ParameterError> {
        required_uint("k", self.k.as_deref(), 1)
    }

    /// `pattern`, required and non-empty
    pub fn require_pattern(&self) -> Result<&str, ParameterError> {
        self.pattern
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ParameterError::MissingField("pattern".to_string()))
    }

    /// Optional `column` of the list view
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref().filter(|c| !c.is_empty())
    }
}

fn required_uint(field: &str, raw: Option<&str>, min: u64) -> Result<u64, ParameterError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParameterError::MissingField(field.to_string()))?;
    let value = raw
        .parse::<u64>()
        .map_err(|_| ParameterError::invalid(field, format!("'{}' is not an integer", raw)))?;
    if value < min {
        return Err(ParameterError::invalid(
            field,
            format!("must be at least {}", min),
        ));
    }
    Ok(value)
}
