//! Result post-processing
//!
//! Turns raw store output into the typed payloads of each view:
//! year densification with N/A bucketing, quartile extraction, and
//! document-to-row conversion.
//!
//! # Year densification
//!
//! ```text
//! raw:     [null:2, 0:1, 2019:4, 2021:1, 2030:5]   domain 2019..=2022
//! fixed:   ["N/A":8, 2019:4, 2020:0, 2021:1, 2022:0]
//! ```

use crate::query::ast::Document;
use crate::types::{InfoRow, ListItem, QuartileResult, TimeSeries, TopKPoint, YearLabel};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// Years
// =============================================================================

/// Calendar bounds of the years axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearDomain {
    /// First year shown
    pub min: i32,
    /// Last year shown
    pub max: i32,
}

impl Default for YearDomain {
    fn default() -> Self {
        Self {
            min: 1936,
            max: 2022,
        }
    }
}

/// One raw `(year, count)` point; `None` is a null or missing year
pub type YearPoint = (Option<i64>, i64);

/// Densify a raw year series over the effective domain
///
/// The domain is `[max(domain.min, start), min(domain.max, end)]`. Points
/// with a null or zero year, or a year outside the domain, are summed into
/// a leading N/A bucket that exists only when such points exist. Missing
/// domain years are zero-filled; duplicate years are summed.
pub fn fix_year_data(
    points: &[YearPoint],
    start: Option<i64>,
    end: Option<i64>,
    domain: YearDomain,
) -> TimeSeries {
    let lo = start.map_or(i64::from(domain.min), |s| s.max(i64::from(domain.min)));
    let hi = end.map_or(i64::from(domain.max), |e| e.min(i64::from(domain.max)));

    let mut by_year: BTreeMap<i64, i64> = BTreeMap::new();
    let mut na: Option<i64> = None;

    for &(year, count) in points {
        match year {
            Some(y) if y != 0 && (lo..=hi).contains(&y) => {
                *by_year.entry(y).or_insert(0) += count;
            },
            _ => *na.get_or_insert(0) += count,
        }
    }

    let mut series = TimeSeries::default();
    if let Some(total) = na {
        series.years.push(YearLabel::NotAvailable);
        series.counts.push(total);
    }
    for year in lo..=hi {
        // bounded by the i32 domain
        series.years.push(YearLabel::Year(year as i32));
        series.counts.push(by_year.get(&year).copied().unwrap_or(0));
    }
    series
}

/// Extract raw points from the `{years, counts}` document of a years pipeline
pub fn year_points(docs: &[Document]) -> Vec<YearPoint> {
    let Some(doc) = docs.first() else {
        return Vec::new();
    };
    let years = doc.get("years").and_then(Value::as_array);
    let counts = doc.get("counts").and_then(Value::as_array);
    match (years, counts) {
        (Some(years), Some(counts)) => years
            .iter()
            .zip(counts)
            .map(|(y, c)| (as_int(y), as_int(c).unwrap_or(0)))
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Quartiles
// =============================================================================

/// Multipliers of `[min, Q1, median, Q3, max]`
pub const QUARTILE_MULTIPLIERS: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Index of the element at fraction `m` of a sorted list of `row_count`
pub fn quartile_position(row_count: usize, m: f64) -> usize {
    if row_count == 0 {
        return 0;
    }
    let last = row_count - 1;
    if m >= 1.0 {
        last
    } else if m <= 0.0 {
        0
    } else {
        ((row_count as f64 * m).round() as usize).min(last)
    }
}

/// Five-number summary of ascending `values`
///
/// Empty input gives all zeros.
pub fn compute_quartiles(values: &[i64]) -> QuartileResult {
    let mut out = [0; 5];
    if values.is_empty() {
        return out;
    }
    for (slot, m) in out.iter_mut().zip(QUARTILE_MULTIPLIERS) {
        *slot = values[quartile_position(values.len(), m)];
    }
    out
}

/// Metric values of quartile pipeline output
pub fn metric_values(docs: &[Document], field: &str) -> Vec<i64> {
    docs.iter()
        .map(|d| d.get(field).and_then(as_int).unwrap_or(0))
        .collect()
}

// =============================================================================
// Rows and points
// =============================================================================

fn as_int(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// Info table rows from projected group documents
pub fn info_rows(docs: &[Document]) -> Vec<InfoRow> {
    docs.iter()
        .map(|d| InfoRow {
            key: d.get("key").cloned().unwrap_or(Value::Null),
            label: d.get("label").and_then(Value::as_str).map(str::to_string),
            papers_count: d.get("papersCount").and_then(as_int).unwrap_or(0),
            in_citations_count: d.get("inCitationsCount").and_then(as_int).unwrap_or(0),
            year_published_first: d.get("yearPublishedFirst").and_then(as_int),
            year_published_last: d.get("yearPublishedLast").and_then(as_int),
            in_citations_per_paper: d
                .get("inCitationsPerPaper")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        })
        .collect()
}

/// Total of a `$count` pipeline (no document means zero)
pub fn row_count(docs: &[Document], field: &str) -> u64 {
    docs.first()
        .and_then(|d| d.get(field))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Chart points of a top-k pipeline
pub fn topk_points(docs: &[Document]) -> Vec<TopKPoint> {
    docs.iter()
        .map(|d| TopKPoint {
            x: d.get("x").cloned().unwrap_or(Value::Null),
            y: d.get("y").and_then(as_int).unwrap_or(0),
        })
        .collect()
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Suggestions from a collection lookup
pub fn list_from_documents(docs: &[Document], column: &str) -> Vec<ListItem> {
    docs.iter()
        .filter_map(|d| {
            let value = d.get(column)?.as_str()?.to_string();
            Some(ListItem {
                id: d.get("_id").and_then(id_string),
                value,
            })
        })
        .collect()
}

/// Suggestions from a distinct-value pipeline
pub fn list_from_values(docs: &[Document]) -> Vec<ListItem> {
    docs.iter()
        .filter_map(|d| {
            Some(ListItem {
                id: None,
                value: d.get("_id")?.as_str()?.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn domain(min: i32, max: i32) -> YearDomain {
        YearDomain { min, max }
    }

    #[test]
    fn test_fix_year_data_buckets_and_fills() {
        let points = vec![
            (None, 2),
            (Some(0), 1),
            (Some(2019), 4),
            (Some(2021), 1),
            (Some(2030), 5),
        ];
        let series = fix_year_data(&points, None, None, domain(2019, 2022));
        assert_eq!(
            series.years,
            vec![
                YearLabel::NotAvailable,
                YearLabel::Year(2019),
                YearLabel::Year(2020),
                YearLabel::Year(2021),
                YearLabel::Year(2022),
            ]
        );
        assert_eq!(series.counts, vec![8, 4, 0, 1, 0]);
    }

    #[test]
    fn test_fix_year_data_no_na_without_bad_points() {
        let series = fix_year_data(&[(Some(2020), 3)], Some(2020), Some(2021), YearDomain::default());
        assert_eq!(series.years, vec![YearLabel::Year(2020), YearLabel::Year(2021)]);
        assert_eq!(series.counts, vec![3, 0]);
    }

    #[test]
    fn test_fix_year_data_clamps_request_to_domain() {
        let series = fix_year_data(&[], Some(1900), Some(2100), domain(2000, 2002));
        assert_eq!(series.len(), 3);
        assert_eq!(series.years.first(), Some(&YearLabel::Year(2000)));
        assert_eq!(series.years.last(), Some(&YearLabel::Year(2002)));
    }

    #[test]
    fn test_fix_year_data_empty_domain() {
        let series = fix_year_data(&[], Some(2022), Some(2020), YearDomain::default());
        assert!(series.is_empty());
        assert!(series.counts.is_empty());

        let series = fix_year_data(&[(None, 2)], Some(2022), Some(2020), YearDomain::default());
        assert_eq!(series.years, vec![YearLabel::NotAvailable]);
        assert_eq!(series.counts, vec![2]);
    }

    #[test]
    fn test_fix_year_data_post_conditions() {
        let points = vec![(Some(1990), 1), (Some(1995), 2), (None, 1)];
        let series = fix_year_data(&points, None, None, YearDomain::default());
        assert_eq!(series.years.len(), series.counts.len());
        let years: Vec<i32> = series.years.iter().filter_map(YearLabel::year).collect();
        assert_eq!(years.first(), Some(&1936));
        assert_eq!(years.last(), Some(&2022));
        assert!(years.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(series.counts.iter().sum::<i64>(), 4);
    }

    #[test]
    fn test_quartile_positions() {
        assert_eq!(quartile_position(10, 0.0), 0);
        assert_eq!(quartile_position(10, 1.0), 9);
        assert_eq!(quartile_position(10, 0.5), 5);
        assert_eq!(quartile_position(3, 0.75), 2);
        assert_eq!(quartile_position(1, 0.5), 0);
        assert_eq!(quartile_position(0, 0.5), 0);
    }

    #[test]
    fn test_compute_quartiles() {
        assert_eq!(compute_quartiles(&[]), [0, 0, 0, 0, 0]);
        assert_eq!(compute_quartiles(&[7]), [7, 7, 7, 7, 7]);
        assert_eq!(compute_quartiles(&[0, 1, 2]), [0, 1, 2, 2, 2]);
    }

    #[test]
    fn test_year_points_from_document() {
        let doc = json!({"_id": null, "years": [null, 2020], "counts": [1, 3]})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(year_points(&[doc]), vec![(None, 1), (Some(2020), 3)]);
        assert!(year_points(&[]).is_empty());
    }

    #[test]
    fn test_row_count_defaults_to_zero() {
        assert_eq!(row_count(&[], "rowCount"), 0);
    }

    #[test]
    fn test_list_items() {
        let docs: Vec<Document> = vec![
            json!({"_id": "a1", "name": "Ada"}).as_object().cloned().unwrap(),
            json!({"_id": "a2"}).as_object().cloned().unwrap(),
        ];
        let items = list_from_documents(&docs, "name");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some("a1"));

        let values: Vec<Document> = vec![json!({"_id": "Biology"}).as_object().cloned().unwrap()];
        assert_eq!(list_from_values(&values)[0].value, "Biology");
    }
}
