//! Property Tests for Result Post-Processing and Rankings
//!
//! Uses property-based testing (proptest) to check the invariants of year
//! densification, quartile extraction and top-k rankings over arbitrary
//! inputs.

use proptest::prelude::*;
use scholar_analytics::{
    analytics::{AnalyticsConfig, AnalyticsEngine},
    pipeline::Dimension,
    postprocess::{
        compute_quartiles, fix_year_data, quartile_position, YearDomain, YearPoint,
        QUARTILE_MULTIPLIERS,
    },
    query::{ast::Document, AnalyticsRequest, RawParams},
    store::{InMemoryStore, PAPERS},
    types::YearLabel,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for raw year points, including the null and zero years
fn year_point() -> impl Strategy<Value = YearPoint> {
    let year = prop_oneof![
        1 => Just(None),
        1 => Just(Some(0i64)),
        8 => (1900i64..2100).prop_map(Some),
    ];
    (year, 0i64..1000)
}

/// Strategy for an optional requested year bound
fn year_bound() -> impl Strategy<Value = Option<i64>> {
    prop_oneof![Just(None), (1900i64..2100).prop_map(Some)]
}

/// Strategy for a year domain, occasionally narrow
fn year_domain() -> impl Strategy<Value = YearDomain> {
    prop_oneof![
        Just(YearDomain::default()),
        (1930i32..2030, 0i32..20).prop_map(|(min, span)| YearDomain {
            min,
            max: min + span
        }),
    ]
}

/// Strategy for papers with a few authors each from a small pool
fn papers() -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(
        (prop::collection::vec(0usize..8, 0..4), 0i64..50),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (authors, citations))| {
                let authors: Vec<String> = authors.iter().map(|a| format!("a{}", a)).collect();
                json!({
                    "_id": format!("p{}", i),
                    "authors": authors,
                    "yearPublished": 2020,
                    "inCitationsCount": citations,
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect()
    })
}

// =============================================================================
// Year Densification
// =============================================================================

mod year_series {
    use super::*;

    proptest! {
        /// Years and counts stay index-aligned, the axis is consecutive and
        /// spans exactly the clamped domain
        #[test]
        fn axis_spans_clamped_domain(
            points in prop::collection::vec(year_point(), 0..200),
            start in year_bound(),
            end in year_bound(),
            domain in year_domain(),
        ) {
            let series = fix_year_data(&points, start, end, domain);
            prop_assert_eq!(series.years.len(), series.counts.len());

            let lo = start.map_or(i64::from(domain.min), |s| s.max(i64::from(domain.min)));
            let hi = end.map_or(i64::from(domain.max), |e| e.min(i64::from(domain.max)));

            let skip = usize::from(series.years.first() == Some(&YearLabel::NotAvailable));
            let years: Vec<i64> = series.years[skip..]
                .iter()
                .map(|y| y.year().map(i64::from))
                .collect::<Option<Vec<_>>>()
                .expect("N/A may only lead the series");

            let expected: Vec<i64> = if lo <= hi { (lo..=hi).collect() } else { Vec::new() };
            prop_assert_eq!(years, expected);
        }

        /// N/A appears exactly when some point is null, zero or out of range,
        /// and no count is lost
        #[test]
        fn na_bucket_collects_the_rest(
            points in prop::collection::vec(year_point(), 0..200),
            start in year_bound(),
            end in year_bound(),
        ) {
            let domain = YearDomain::default();
            let series = fix_year_data(&points, start, end, domain);

            let lo = start.map_or(1936, |s| s.max(1936));
            let hi = end.map_or(2022, |e| e.min(2022));
            let has_bad = points.iter().any(|(year, _)| match year {
                Some(y) => *y == 0 || *y < lo || *y > hi,
                None => true,
            });

            prop_assert_eq!(series.years.first() == Some(&YearLabel::NotAvailable), has_bad);
            prop_assert_eq!(
                series.counts.iter().sum::<i64>(),
                points.iter().map(|(_, c)| c).sum::<i64>()
            );
        }
    }
}

// =============================================================================
// Quartiles
// =============================================================================

mod quartiles {
    use super::*;

    proptest! {
        /// Endpoints map to the first and last row, every position is in bounds
        #[test]
        fn positions_in_bounds(n in 1usize..10_000, m in 0.0f64..=1.0) {
            prop_assert_eq!(quartile_position(n, 0.0), 0);
            prop_assert_eq!(quartile_position(n, 1.0), n - 1);
            prop_assert!(quartile_position(n, m) < n);
            for multiplier in QUARTILE_MULTIPLIERS {
                prop_assert!(quartile_position(n, multiplier) < n);
            }
        }

        /// Positions never decrease as the multiplier grows
        #[test]
        fn positions_monotonic(n in 1usize..10_000) {
            let positions: Vec<usize> = QUARTILE_MULTIPLIERS
                .iter()
                .map(|m| quartile_position(n, *m))
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] <= w[1]));
        }

        /// The summary of sorted values is ordered and bracketed by min and max
        #[test]
        fn summary_of_sorted_rows(mut values in prop::collection::vec(-1000i64..1000, 1..500)) {
            values.sort_unstable();
            let summary = compute_quartiles(&values);

            prop_assert_eq!(summary[0], values[0]);
            prop_assert_eq!(summary[4], values[values.len() - 1]);
            prop_assert!(summary.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}

// =============================================================================
// Top-k
// =============================================================================

mod topk {
    use super::*;

    proptest! {
        /// Rankings are descending by y and hold min(k, groups) points
        #[test]
        fn ranking_sorted_and_bounded(docs in papers(), k in 1u64..12) {
            let groups: BTreeSet<String> = docs
                .iter()
                .filter_map(|d| d.get("authors").and_then(|a| a.as_array()))
                .flatten()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect();

            let store = InMemoryStore::new();
            store.insert(PAPERS, docs);
            let engine = AnalyticsEngine::new(Arc::new(store), AnalyticsConfig::default());

            let params: RawParams = [
                ("k".to_string(), k.to_string()),
                ("metric".to_string(), "inCitationsCount".to_string()),
            ]
            .into_iter()
            .collect();
            let req = AnalyticsRequest::parse(&params).unwrap();
            let dim = Dimension::lookup("authors").unwrap();

            let points = tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(engine.topk(dim, &req))
                .unwrap();

            prop_assert_eq!(points.len() as u64, k.min(groups.len() as u64));
            prop_assert!(points.windows(2).all(|w| w[0].y >= w[1].y));
        }
    }
}
