//! HTTP Integration Tests
//!
//! Drives the real router over a seeded in-memory store.
//!
//! # Test Coverage
//!
//! 1. **Years** - densified year series, inverted ranges
//! 2. **Info** - paging, sorting, row counts
//! 3. **Quartiles / Top-k** - metric validation, summaries, rankings
//! 4. **List** - collection-backed and value-backed suggestions
//! 5. **Caching** - repeated requests are served without store calls
//! 6. **Errors** - unknown routes, bad parameters, store failures
//! 7. **Health / Metrics**

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use scholar_analytics::{
    analytics::{AnalyticsConfig, AnalyticsEngine},
    cache::CacheConfig,
    error::StoreError,
    query::ast::{Document, FindQuery, Pipeline},
    server::{build_router, AppState},
    store::{DocumentStore, InMemoryStore},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ALICE: &str = "aaaaaaaaaaaaaaaaaaaaaaaa";
const BOB: &str = "bbbbbbbbbbbbbbbbbbbbbbbb";
const NEURIPS: &str = "cccccccccccccccccccccccc";

// =============================================================================
// Fixtures
// =============================================================================

fn seed() -> Value {
    json!({
        "papers": [
            {
                "_id": "p1", "title": "Attention", "doi": "10.1/a",
                "yearPublished": 2022, "authors": [ALICE],
                "venue": NEURIPS, "publisher": "Springer",
                "fieldsOfStudy": ["Computer Science"], "typeOfPaper": "conference",
                "inCitationsCount": 2, "outCitationsCount": 5
            },
            {
                "_id": "p2", "title": "Boosting", "doi": "10.1/b",
                "yearPublished": 2020, "authors": [ALICE],
                "venue": null, "publisher": "Elsevier",
                "fieldsOfStudy": ["Mathematics"], "typeOfPaper": "journal",
                "inCitationsCount": 0, "outCitationsCount": 1
            },
            {
                "_id": "p3", "title": "Convolutions", "doi": "10.1/c",
                "yearPublished": 2022, "authors": [BOB],
                "venue": NEURIPS, "publisher": "Springer",
                "fieldsOfStudy": ["Computer Science", "Mathematics"], "typeOfPaper": "conference",
                "inCitationsCount": 1, "outCitationsCount": 2
            }
        ],
        "authors": [
            {"_id": ALICE, "name": "Alice Smith"},
            {"_id": BOB, "name": "Bob Jones"}
        ],
        "venues": [
            {"_id": NEURIPS, "name": "NeurIPS", "issn": "1049-5258"}
        ]
    })
}

fn seeded_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::from_seed(seed()).unwrap())
}

fn router_for(store: Arc<dyn DocumentStore>) -> Router {
    let engine = AnalyticsEngine::new(store, AnalyticsConfig::default());
    build_router(Arc::new(AppState::new(engine, CacheConfig::default())))
}

fn setup() -> (Router, Arc<InMemoryStore>) {
    let store = seeded_store();
    (router_for(store.clone()), store)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(json!({}));

    (status, json)
}

// =============================================================================
// Years
// =============================================================================

#[tokio::test]
async fn test_years_densified_over_requested_range() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/papers/years?yearStart=2020&yearEnd=2022").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"years": [2020, 2021, 2022], "counts": [1, 0, 2]}));
}

#[tokio::test]
async fn test_years_inverted_range_is_empty() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/papers/years?yearStart=2022&yearEnd=2020").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"years": [], "counts": []}));
}

#[tokio::test]
async fn test_years_counts_distinct_authors() {
    let (router, _) = setup();

    let (_, body) = get(&router, "/api/v1/fe/authors/years?yearStart=2021&yearEnd=2022").await;

    // Alice and Bob both published in 2022
    assert_eq!(body, json!({"years": [2021, 2022], "counts": [0, 2]}));
}

#[tokio::test]
async fn test_years_sums_citations() {
    let (router, _) = setup();

    let (_, body) = get(&router, "/api/v1/fe/citationsIn/years?yearStart=2020&yearEnd=2022").await;

    assert_eq!(body, json!({"years": [2020, 2021, 2022], "counts": [0, 0, 3]}));
}

#[tokio::test]
async fn test_years_filtered_by_author() {
    let (router, _) = setup();

    let uri = format!(
        "/api/v1/fe/papers/years?yearStart=2020&yearEnd=2022&authorIds=%5B%22{}%22%5D",
        BOB
    );
    let (status, body) = get(&router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"], json!([0, 0, 1]));
}

// =============================================================================
// Info
// =============================================================================

#[tokio::test]
async fn test_info_pages_sorted_rows() {
    let (router, _) = setup();

    let (status, body) = get(
        &router,
        "/api/v1/fe/papers/info?page=1&pageSize=2&sortField=inCitationsCount&sortDirection=desc",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rowCount"], json!(3));
    let rows = body["rows"].as_array().unwrap();
    // Page 1 of size 2 holds only the third row
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["key"], json!("p2"));
    assert_eq!(rows[0]["label"], json!("Boosting"));
    assert_eq!(rows[0]["inCitationsCount"], json!(0));
}

#[tokio::test]
async fn test_info_groups_null_venue_under_sentinel() {
    let (router, _) = setup();

    let (status, body) = get(
        &router,
        "/api/v1/fe/venues/info?page=0&pageSize=10&sortField=papersCount&sortDirection=desc",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rowCount"], json!(2));
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows[0]["key"], json!(NEURIPS));
    assert_eq!(rows[0]["papersCount"], json!(2));
    assert_eq!(rows[0]["inCitationsPerPaper"], json!(1.5));
    assert_eq!(rows[0]["yearPublishedFirst"], json!(2022));
    assert_eq!(rows[1]["key"], json!("N/A"));
}

#[tokio::test]
async fn test_info_unsorted_page_skips_once() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/papers/info?page=1&pageSize=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rowCount"], json!(3));
    let rows = body["rows"].as_array().unwrap();
    // Groups keep first-seen order; page 1 starts after two rows
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["key"], json!("p3"));
}

#[tokio::test]
async fn test_info_requires_paging() {
    let (router, store) = setup();

    let (status, body) = get(&router, "/api/v1/fe/authors/info?page=0").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("pageSize"));
    assert_eq!(store.query_count(), 0);
}

// =============================================================================
// Quartiles and Top-k
// =============================================================================

#[tokio::test]
async fn test_quartiles_requires_metric() {
    let (router, store) = setup();

    let (status, _) = get(&router, "/api/v1/fe/papers/quartiles").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_quartiles_count_papers_per_group_by_default() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/authors/quartiles").await;

    // Bob has one paper, Alice two
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([1, 2, 2, 2, 2]));

    let (status, _) = get(&router, "/api/v1/fe/authors/quartiles?metric=hIndex").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_quartiles_of_paper_citations() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/papers/quartiles?metric=inCitationsCount").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([0, 1, 2, 2, 2]));
}

#[tokio::test]
async fn test_quartiles_single_group_repeats_value() {
    let (router, _) = setup();

    let (_, body) = get(
        &router,
        "/api/v1/fe/papers/quartiles?metric=inCitationsCount&citationsMin=2",
    )
    .await;

    assert_eq!(body, json!([2, 2, 2, 2, 2]));
}

#[tokio::test]
async fn test_quartiles_no_groups_are_zero() {
    let (router, _) = setup();

    let (_, body) = get(
        &router,
        "/api/v1/fe/papers/quartiles?metric=papersCount&yearStart=1990&yearEnd=1991",
    )
    .await;

    assert_eq!(body, json!([0, 0, 0, 0, 0]));
}

#[tokio::test]
async fn test_topk_requires_k_and_metric() {
    let (router, store) = setup();

    let (status, _) = get(&router, "/api/v1/fe/authors/topk").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&router, "/api/v1/fe/authors/topk?k=3").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&router, "/api/v1/fe/authors/topk?k=0&metric=papersCount").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&router, "/api/v1/fe/authors/topk?k=3&metric=bogus").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_topk_ranks_authors() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/authors/topk?k=1&metric=papersCount").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"x": ALICE, "y": 2}]));
}

#[tokio::test]
async fn test_topk_papers_use_titles() {
    let (router, _) = setup();

    let (_, body) = get(&router, "/api/v1/fe/papers/topk?k=2&metric=inCitationsCount").await;

    assert_eq!(
        body,
        json!([{"x": "Attention", "y": 2}, {"x": "Convolutions", "y": 1}])
    );
}

// =============================================================================
// List
// =============================================================================

#[tokio::test]
async fn test_list_authors_by_name() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/authors/list?pattern=ali").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"_id": ALICE, "value": "Alice Smith"}]));
}

#[tokio::test]
async fn test_list_publishers_distinct_values() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/publishers/list?pattern=e").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"value": "Elsevier"}, {"value": "Springer"}]));
}

#[tokio::test]
async fn test_list_pattern_is_literal() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/api/v1/fe/venues/list?pattern=.%2A").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_list_requires_pattern_and_known_column() {
    let (router, _) = setup();

    let (status, _) = get(&router, "/api/v1/fe/authors/list").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&router, "/api/v1/fe/authors/list?pattern=a&column=email").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_repeated_request_served_from_cache() {
    let (router, store) = setup();
    let uri = "/api/v1/fe/venues/years?yearStart=2020&yearEnd=2022";

    let (status, first) = get(&router, uri).await;
    assert_eq!(status, StatusCode::OK);
    let calls = store.query_count();
    assert!(calls > 0);

    let (status, second) = get(&router, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(store.query_count(), calls);

    let (status, stats) = get(&router, "/api/v1/cache/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["dimensions"]["venues"]["hits"], json!(1));
    assert_eq!(stats["dimensions"]["venues"]["entries"], json!(1));
    assert_eq!(stats["totalHits"], json!(1));
}

#[tokio::test]
async fn test_failed_requests_are_not_cached() {
    let (router, _) = setup();

    get(&router, "/api/v1/fe/papers/quartiles").await;
    get(&router, "/api/v1/fe/papers/quartiles").await;

    let (_, stats) = get(&router, "/api/v1/cache/stats").await;
    assert_eq!(stats["dimensions"]["papers"]["entries"], json!(0));
    assert_eq!(stats["dimensions"]["papers"]["hits"], json!(0));
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_unknown_routes_are_not_found() {
    let (router, store) = setup();

    let (status, body) = get(&router, "/api/v1/fe/keywords/years").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());

    let (status, _) = get(&router, "/api/v1/fe/papers/histogram").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/api/v1/fe/citationsIn/info?page=0&pageSize=5").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/api/v1/fe/typesOfPaper/list?pattern=j").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&router, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_malformed_filter_is_rejected() {
    let (router, store) = setup();

    let (status, _) = get(&router, "/api/v1/fe/papers/years?authorIds=not-json").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = get(&router, "/api/v1/fe/papers/years?venueIds=%5B%22xyz%22%5D").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn test_empty_open_access_does_not_filter() {
    let (router, _) = setup();

    let (status, body) = get(
        &router,
        "/api/v1/fe/papers/years?yearStart=2020&yearEnd=2022&openAccess=",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"], json!([1, 0, 2]));
}

#[tokio::test]
async fn test_year_bounds_read_leading_integer() {
    let (router, _) = setup();

    let (status, body) = get(
        &router,
        "/api/v1/fe/papers/years?yearStart=2021abc&yearEnd=2022.5",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"years": [2021, 2022], "counts": [0, 2]}));
}

/// Store that fails every call
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    fn engine_id(&self) -> &str {
        "failing"
    }

    async fn aggregate(&self, _: &str, _: &Pipeline) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Connection("store unreachable".to_string()))
    }

    async fn find(&self, _: &str, _: &FindQuery) -> Result<Vec<Document>, StoreError> {
        Err(StoreError::Connection("store unreachable".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Connection("store unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let router = router_for(Arc::new(FailingStore));

    let (status, body) = get(&router, "/api/v1/fe/papers/years").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("store unreachable"));

    let (status, _) = get(&router, "/api/v1/fe/papers/info?page=0&pageSize=5").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    // Parameter errors still win over store errors
    let (status, _) = get(&router, "/api/v1/fe/papers/topk").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Health and Metrics
// =============================================================================

#[tokio::test]
async fn test_health_reports_store() {
    let (router, _) = setup();

    let (status, body) = get(&router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["store"], json!("memory"));
}

#[tokio::test]
async fn test_health_unavailable_when_store_down() {
    let router = router_for(Arc::new(FailingStore));

    let (status, body) = get(&router, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], json!("unhealthy"));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_prometheus_format() {
    let (router, _) = setup();
    get(&router, "/api/v1/fe/papers/years").await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();

    assert!(body_str.contains("analytics_requests_total"));
    assert!(body_str.contains("analytics_cache_entries"));
}
