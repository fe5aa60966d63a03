//! Core data types used throughout the analytics engine
//!
//! # Key Types
//!
//! - **`RefId`**: Store-native reference id (24 hex digits)
//! - **`Bounds`**: Optional inclusive `gte`/`lte` range
//! - **`TimeSeries`**: Year-indexed counts, optionally led by an N/A bucket
//! - **`QuartileResult`**: `[min, Q1, median, Q3, max]`
//! - **`PagedResult`**: Row count plus one page of rows
//! - **`TopKPoint`**: Chart-ready `{x, y}` pair
//!
//! # Example
//!
//! ```rust
//! use scholar_analytics::types::{RefId, YearLabel};
//!
//! let id = RefId::parse("5F1A2B3C4D5E6F7A8B9C0D1E").unwrap();
//! assert_eq!(id.as_str(), "5f1a2b3c4d5e6f7a8b9c0d1e");
//!
//! let na = serde_json::to_value(YearLabel::NotAvailable).unwrap();
//! assert_eq!(na, serde_json::json!("N/A"));
//! ```

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Label used for the N/A year bucket and for null dimension groups
pub const NA_LABEL: &str = "N/A";

// =============================================================================
// Reference Ids
// =============================================================================

/// Reference id of a stored document (author, venue, paper)
///
/// Mirrors the 12-byte object ids of the production store: exactly 24 hex
/// digits, kept in lower case so equality is case-insensitive on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Parse and normalize a reference id
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() != 24 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("'{}' is not a valid reference id", s));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Ranges
// =============================================================================

/// Inclusive integer bounds, each side optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Lower bound (inclusive)
    pub gte: Option<i64>,
    /// Upper bound (inclusive)
    pub lte: Option<i64>,
}

impl Bounds {
    /// True when neither side is set
    pub fn is_unbounded(&self) -> bool {
        self.gte.is_none() && self.lte.is_none()
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Metric summed per group by the quartile and top-k views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Number of papers in the group
    PapersCount,
    /// Sum of incoming citations
    InCitationsCount,
    /// Sum of outgoing citations
    OutCitationsCount,
}

impl Metric {
    /// Parse a metric name as sent by the frontend
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "papersCount" => Some(Metric::PapersCount),
            "inCitationsCount" => Some(Metric::InCitationsCount),
            "outCitationsCount" => Some(Metric::OutCitationsCount),
            _ => None,
        }
    }

    /// Document field summed for this metric (`None` = count documents)
    pub fn source_field(&self) -> Option<&'static str> {
        match self {
            Metric::PapersCount => None,
            Metric::InCitationsCount => Some("inCitationsCount"),
            Metric::OutCitationsCount => Some("outCitationsCount"),
        }
    }

    /// Wire name of the metric
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PapersCount => "papersCount",
            Metric::InCitationsCount => "inCitationsCount",
            Metric::OutCitationsCount => "outCitationsCount",
        }
    }
}

// =============================================================================
// Time Series
// =============================================================================

/// Entry of the `years` axis: a calendar year or the N/A bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearLabel {
    /// Aggregates missing and out-of-domain years
    NotAvailable,
    /// Calendar year
    Year(i32),
}

impl YearLabel {
    /// The year, if this is not the N/A bucket
    pub fn year(&self) -> Option<i32> {
        match self {
            YearLabel::NotAvailable => None,
            YearLabel::Year(y) => Some(*y),
        }
    }
}

impl Serialize for YearLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            YearLabel::NotAvailable => serializer.serialize_str(NA_LABEL),
            YearLabel::Year(y) => serializer.serialize_i32(*y),
        }
    }
}

/// Year distribution with index-aligned counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeSeries {
    /// Year axis
    pub years: Vec<YearLabel>,
    /// Count for the year at the same index
    pub counts: Vec<i64>,
}

impl TimeSeries {
    /// Number of points in the series
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// True when the series has no points
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

// =============================================================================
// Tabular and chart results
// =============================================================================

/// Five-number summary `[min, Q1, median, Q3, max]`
pub type QuartileResult = [i64; 5];

/// One page of rows plus the total row count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    /// Total rows across all pages
    pub row_count: u64,
    /// Rows of the requested page
    pub rows: Vec<T>,
}

/// Per-group statistics row of the info table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoRow {
    /// Dimension value, or the dimension's N/A sentinel
    pub key: serde_json::Value,
    /// Display label where the dimension has one (paper title)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Papers in the group
    pub papers_count: i64,
    /// Incoming citations summed over the group
    pub in_citations_count: i64,
    /// Earliest publication year
    pub year_published_first: Option<i64>,
    /// Latest publication year
    pub year_published_last: Option<i64>,
    /// `in_citations_count / papers_count`
    pub in_citations_per_paper: f64,
}

/// Chart point of a top-k ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopKPoint {
    /// Group label
    pub x: serde_json::Value,
    /// Metric value
    pub y: i64,
}

/// Typeahead suggestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    /// Document id, absent for value-backed dimensions
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Matched text
    pub value: String,
}
