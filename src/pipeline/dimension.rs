//! Dimension descriptors
//!
//! Every analytics endpoint group is one [`Dimension`]: a static
//! description of which paper field it groups on and which views it
//! serves. The engine and the pipeline assembler are generic over these
//! descriptors, so adding a dimension is adding a table entry.

use crate::store::{AUTHORS, PAPERS, VENUES};
use crate::types::Metric;
use std::fmt;

// =============================================================================
// Views
// =============================================================================

/// Analytics view served under `/{dimension}/{view}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Year distribution
    Years,
    /// Paged per-group statistics
    Info,
    /// Five-number summary of a metric
    Quartiles,
    /// Top-k ranking of a metric
    TopK,
    /// Typeahead suggestions
    List,
}

impl View {
    /// Parse a view from its path segment
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "years" => Some(View::Years),
            "info" => Some(View::Info),
            "quartiles" => Some(View::Quartiles),
            "topk" => Some(View::TopK),
            "list" => Some(View::List),
            _ => None,
        }
    }

    /// Path segment of the view
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Years => "years",
            View::Info => "info",
            View::Quartiles => "quartiles",
            View::TopK => "topk",
            View::List => "list",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// How the years view measures each year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearMetric {
    /// Number of distinct dimension values published that year
    Distinct,
    /// Sum of a numeric paper field over the year
    Sum(&'static str),
}

/// Where typeahead suggestions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// Documents of a dedicated collection, matched on a text column
    Collection {
        /// Collection name
        collection: &'static str,
        /// Columns a client may search; the first is the default
        columns: &'static [&'static str],
    },
    /// Distinct values of the dimension field on papers
    Values,
}

/// Declarative description of one analytics dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    /// Path segment (`/api/v1/fe/{name}/...`)
    pub name: &'static str,
    /// Paper field grouped on
    pub field: &'static str,
    /// Field holds an array of values
    pub unwind: bool,
    /// Paper field carried as the display label of a group
    pub label: Option<&'static str>,
    /// Key reported for the group of papers without a value
    pub sentinel: &'static str,
    /// Measure of the years view
    pub year_metric: YearMetric,
    /// Quartiles metric used when the request names none (`None` = required)
    pub quartiles_metric: Option<Metric>,
    /// Source of list suggestions
    pub list: Option<ListSource>,
    /// Views served by this dimension
    pub views: &'static [View],
}

const ALL_VIEWS: &[View] = &[View::Years, View::Info, View::Quartiles, View::TopK, View::List];
const NO_LIST: &[View] = &[View::Years, View::Info, View::Quartiles, View::TopK];
const YEARS_ONLY: &[View] = &[View::Years];

/// Every dimension served by the API
pub const DIMENSIONS: &[Dimension] = &[
    Dimension {
        name: "papers",
        field: "_id",
        unwind: false,
        label: Some("title"),
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: None,
        list: Some(ListSource::Collection {
            collection: PAPERS,
            columns: &["title", "doi"],
        }),
        views: ALL_VIEWS,
    },
    Dimension {
        name: "authors",
        field: "authors",
        unwind: true,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: Some(Metric::PapersCount),
        list: Some(ListSource::Collection {
            collection: AUTHORS,
            columns: &["name"],
        }),
        views: ALL_VIEWS,
    },
    Dimension {
        name: "venues",
        field: "venue",
        unwind: false,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: Some(Metric::PapersCount),
        list: Some(ListSource::Collection {
            collection: VENUES,
            columns: &["name", "issn"],
        }),
        views: ALL_VIEWS,
    },
    Dimension {
        name: "publishers",
        field: "publisher",
        unwind: false,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: Some(Metric::PapersCount),
        list: Some(ListSource::Values),
        views: ALL_VIEWS,
    },
    Dimension {
        name: "fieldsOfStudy",
        field: "fieldsOfStudy",
        unwind: true,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: Some(Metric::PapersCount),
        list: Some(ListSource::Values),
        views: ALL_VIEWS,
    },
    Dimension {
        name: "typesOfPaper",
        field: "typeOfPaper",
        unwind: false,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Distinct,
        quartiles_metric: Some(Metric::PapersCount),
        list: None,
        views: NO_LIST,
    },
    Dimension {
        name: "citationsIn",
        field: "inCitationsCount",
        unwind: false,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Sum("inCitationsCount"),
        quartiles_metric: None,
        list: None,
        views: YEARS_ONLY,
    },
    Dimension {
        name: "citationsOut",
        field: "outCitationsCount",
        unwind: false,
        label: None,
        sentinel: crate::types::NA_LABEL,
        year_metric: YearMetric::Sum("outCitationsCount"),
        quartiles_metric: None,
        list: None,
        views: YEARS_ONLY,
    },
];

impl Dimension {
    /// Look a dimension up by path segment
    pub fn lookup(name: &str) -> Option<&'static Dimension> {
        DIMENSIONS.iter().find(|d| d.name == name)
    }

    /// Whether this dimension serves the view
    pub fn supports(&self, view: View) -> bool {
        self.views.contains(&view)
    }

    /// Resolve the `column` parameter of the list view
    ///
    /// Returns `None` when the column is not searchable for this dimension.
    pub fn list_column(&self, requested: Option<&str>) -> Option<&'static str> {
        match self.list? {
            ListSource::Collection { columns, .. } => match requested {
                None => columns.first().copied(),
                Some(col) => columns.iter().copied().find(|c| *c == col),
            },
            ListSource::Values => match requested {
                None => Some(self.field),
                Some(col) if col == self.field => Some(self.field),
                Some(_) => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown() {
        assert_eq!(Dimension::lookup("authors").unwrap().field, "authors");
        assert!(Dimension::lookup("users").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = DIMENSIONS.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DIMENSIONS.len());
    }

    #[test]
    fn test_citation_dimensions_serve_years_only() {
        let citations = Dimension::lookup("citationsIn").unwrap();
        assert!(citations.supports(View::Years));
        assert!(!citations.supports(View::TopK));
        assert!(!Dimension::lookup("typesOfPaper").unwrap().supports(View::List));
    }

    #[test]
    fn test_quartiles_metric_defaults() {
        assert_eq!(Dimension::lookup("papers").unwrap().quartiles_metric, None);
        for name in ["authors", "venues", "publishers", "fieldsOfStudy", "typesOfPaper"] {
            assert_eq!(
                Dimension::lookup(name).unwrap().quartiles_metric,
                Some(Metric::PapersCount),
                "{}",
                name
            );
        }
    }

    #[test]
    fn test_list_columns() {
        let papers = Dimension::lookup("papers").unwrap();
        assert_eq!(papers.list_column(None), Some("title"));
        assert_eq!(papers.list_column(Some("doi")), Some("doi"));
        assert_eq!(papers.list_column(Some("abstract")), None);

        let publishers = Dimension::lookup("publishers").unwrap();
        assert_eq!(publishers.list_column(None), Some("publisher"));
        assert_eq!(publishers.list_column(Some("name")), None);
    }

    #[test]
    fn test_view_parse() {
        for name in ["years", "info", "quartiles", "topk", "list"] {
            assert_eq!(View::parse(name).unwrap().as_str(), name);
        }
        assert!(View::parse("histogram").is_none());
    }
}
