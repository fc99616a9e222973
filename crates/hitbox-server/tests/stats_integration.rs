use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hitbox_core::config::Config;
use hitbox_core::dimension::DimensionKind;
use hitbox_core::stats::PeriodKey;
use hitbox_core::store::{CounterTuple, Site};
use hitbox_duckdb::site::CreateSiteParams;
use hitbox_duckdb::DuckDbBackend;
use hitbox_server::app::build_app;
use hitbox_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/hitbox-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        conflict_retries: 3,
    }
}

async fn setup() -> (Arc<AppState>, axum::Router, Site) {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let site = db
        .create_site(CreateSiteParams {
            name: "Example".to_string(),
            origin: "https://example.com".to_string(),
        })
        .await
        .expect("create site");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(Arc::clone(&state));
    (state, app, site)
}

/// Seed a counter at `count` for (hour bucket, path), resolving the way the
/// gatekeeper would.
async fn seed_counter(state: &AppState, site: &Site, key: PeriodKey, path: &str, count: u64) {
    let period_id = state
        .db
        .resolve_period(&site.id, key)
        .await
        .expect("resolve period");
    let path_id = state
        .db
        .resolve_dimension(&site.id, DimensionKind::Path, path)
        .await
        .expect("resolve path");
    let tuple = CounterTuple {
        site_id: site.id.clone(),
        period_id,
        path_id,
        browser_id: None,
        platform_id: None,
        referrer_id: None,
    };
    for _ in 0..count {
        state
            .db
            .increment_counter(&tuple)
            .await
            .expect("increment");
    }
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("oneshot");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).expect("parse JSON");
    (status, value)
}

fn bucket(day: u32, hour: u32) -> PeriodKey {
    PeriodKey {
        year: 2026,
        month: 8,
        day,
        hour,
    }
}

#[tokio::test]
async fn unknown_site_is_404() {
    let (_state, app, _site) = setup().await;
    let (status, body) = get_json(app, "/api/sites/site_missing00/stats").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn site_without_traffic_gets_zeroes_not_an_error() {
    let (_state, app, site) = setup().await;
    let (status, body) = get_json(app, &format!("/api/sites/{}/stats", site.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counters"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["pages"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["series"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["windows"]["hour"]["current"], 0);
    assert_eq!(body["windows"]["month"]["change"], 0);
}

#[tokio::test]
async fn filter_requires_both_kind_and_dimension_id() {
    let (_state, app, site) = setup().await;
    let (status, _) = get_json(
        app.clone(),
        &format!("/api/sites/{}/stats?kind=path", site.id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(
        app,
        &format!("/api/sites/{}/stats?kind=device&dimension_id=dim_x", site.id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn daily_series_is_gap_filled_through_now() {
    let (state, app, site) = setup().await;
    seed_counter(&state, &site, bucket(1, 9), "/a", 4).await;
    seed_counter(&state, &site, bucket(5, 9), "/a", 7).await;

    let uri = format!(
        "/api/sites/{}/stats?now=2026-08-06T12:00:00Z",
        site.id
    );
    let (status, body) = get_json(app, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let series = body["series"].as_array().expect("series array");
    assert_eq!(series.len(), 6);
    assert_eq!(series[0]["date"], "2026-08-01");
    assert_eq!(series[0]["count"], 4);
    for point in &series[1..4] {
        assert_eq!(point["count"], 0);
    }
    assert_eq!(series[4]["date"], "2026-08-05");
    assert_eq!(series[4]["count"], 7);
    assert_eq!(series[5]["date"], "2026-08-06");
    assert_eq!(series[5]["count"], 0);
}

#[tokio::test]
async fn window_comparisons_carry_signed_change() {
    let (state, app, site) = setup().await;
    seed_counter(&state, &site, bucket(27, 14), "/", 10).await;
    seed_counter(&state, &site, bucket(27, 13), "/", 15).await;

    let uri = format!(
        "/api/sites/{}/stats?now=2026-08-27T14:30:00Z",
        site.id
    );
    let (status, body) = get_json(app, &uri).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["windows"]["hour"]["current"], 10);
    assert_eq!(body["windows"]["hour"]["previous"], 15);
    assert_eq!(body["windows"]["hour"]["change"], -5);

    // Both buckets fall in the current day and month; previous windows empty.
    assert_eq!(body["windows"]["day"]["current"], 25);
    assert_eq!(body["windows"]["day"]["change"], 25);
    assert_eq!(body["windows"]["month"]["current"], 25);
}

#[tokio::test]
async fn rollups_sum_across_periods() {
    let (state, app, site) = setup().await;
    seed_counter(&state, &site, bucket(1, 10), "/a", 3).await;
    seed_counter(&state, &site, bucket(2, 11), "/a", 4).await;
    seed_counter(&state, &site, bucket(2, 11), "/b", 2).await;

    let (status, body) = get_json(app, &format!("/api/sites/{}/stats", site.id)).await;
    assert_eq!(status, StatusCode::OK);

    let pages = body["pages"].as_array().expect("pages array");
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0]["value"], "/a");
    assert_eq!(pages[0]["count"], 7);
    assert_eq!(pages[1]["value"], "/b");
    assert_eq!(pages[1]["count"], 2);
}

#[tokio::test]
async fn dimension_filter_narrows_the_scope() {
    let (state, app, site) = setup().await;
    seed_counter(&state, &site, bucket(1, 10), "/a", 3).await;
    seed_counter(&state, &site, bucket(1, 10), "/b", 2).await;

    let path_a = state
        .db
        .resolve_dimension(&site.id, DimensionKind::Path, "/a")
        .await
        .expect("existing dimension");

    let uri = format!(
        "/api/sites/{}/stats?kind=path&dimension_id={}",
        site.id, path_a
    );
    let (status, body) = get_json(app, &uri).await;
    assert_eq!(status, StatusCode::OK);

    let counters = body["counters"].as_array().expect("counters array");
    assert_eq!(counters.len(), 1);
    let pages = body["pages"].as_array().expect("pages array");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["value"], "/a");
    assert_eq!(pages[0]["count"], 3);
}

#[tokio::test]
async fn end_to_end_ingest_then_read() {
    let (_state, app, site) = setup().await;
    // Three beacons through the real gatekeeper, then read back.
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/event")
                    .header("content-type", "application/json")
                    .header("origin", "https://example.com")
                    .header("sec-ch-ua", r#""Firefox";v="142""#)
                    .body(Body::from(
                        serde_json::json!({ "key": site.public_key, "url": "/home" }).to_string(),
                    ))
                    .expect("build request"),
            )
            .await
            .expect("oneshot");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    let (status, body) = get_json(app, &format!("/api/sites/{}/stats", site.id)).await;
    assert_eq!(status, StatusCode::OK);
    let pages = body["pages"].as_array().expect("pages array");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["value"], "/home");
    assert_eq!(pages[0]["count"], 3);
    let browsers = body["browsers"].as_array().expect("browsers array");
    assert_eq!(browsers[0]["value"], "Firefox");
    assert_eq!(browsers[0]["count"], 3);
    // One counter row behind it all.
    assert_eq!(body["counters"].as_array().map(Vec::len), Some(1));
}
