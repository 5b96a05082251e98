// tests/api_http.rs
mod common;

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt; // for `oneshot`

use common::{as_providers, happy_backend, scored, test_config, DownStore, StaticProvider};
use trend_press::ingest::types::TrendSource;
use trend_press::store::ContentStore;
use trend_press::{build_state, router, MemoryContentStore};

const LIMIT: usize = 1_048_576;

fn providers() -> Vec<Arc<StaticProvider>> {
    vec![
        StaticProvider::ok(
            TrendSource::SearchTrends,
            vec![
                scored("Quantum Computing", 90.0).with_category("technology"),
                scored("Championship Parade", 80.0).with_category("sports"),
            ],
        ),
        StaticProvider::ok(
            TrendSource::SocialTrends,
            vec![scored("Senate Hearing", 60.0).with_category("politics")],
        ),
    ]
}

fn app_with(store: Arc<dyn ContentStore>, admin_token: Option<&str>) -> Router {
    let state = build_state(
        &test_config(),
        as_providers(&providers()),
        happy_backend(),
        store,
        admin_token.map(str::to_string),
    );
    router(state)
}

fn app(admin_token: Option<&str>) -> Router {
    app_with(Arc::new(MemoryContentStore::new()), admin_token)
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(resp.into_body(), LIMIT).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let resp = app(None)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn trends_listing_reports_cache_state() {
    let app = app(None);

    let resp = app
        .clone()
        .oneshot(Request::get("/api/trends").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v["cached"], false);
    assert!(v.get("cacheAgeMinutes").is_none());
    assert_eq!(v["candidates"].as_array().unwrap().len(), 3);
    assert_eq!(v["candidates"][0]["keyword"], "Quantum Computing");
    assert_eq!(v["candidates"][0]["source"], "search-trends");

    let resp = app
        .oneshot(
            Request::get("/api/trends?source=social-trends&limit=5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let v = json_body(resp).await;
    assert_eq!(v["cached"], true);
    assert_eq!(v["cacheAgeMinutes"], 0);
    assert_eq!(v["candidates"].as_array().unwrap().len(), 1);
    assert_eq!(v["candidates"][0]["keyword"], "Senate Hearing");
}

#[tokio::test]
async fn bad_query_parameters_are_400() {
    let app = app(None);
    for uri in ["/api/trends?source=carrier-pigeon", "/api/trends?limit=-3"] {
        let resp = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn admin_routes_require_token_when_configured() {
    let app = app(Some("s3cret"));

    let resp = app
        .clone()
        .oneshot(post_json("/api/admin/trends/refresh", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut req = post_json("/api/admin/trends/refresh", r#"{"categories":["sports"]}"#);
    req.headers_mut()
        .insert("x-admin-token", "s3cret".parse().unwrap());
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["category"], "sports");

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/admin/trends/cache")
        .header("x-admin-token", "s3cret")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn generate_endpoint_returns_articles() {
    let resp = app(None)
        .oneshot(post_json(
            "/api/admin/articles/generate",
            r#"{"maxArticles":1,"categories":["technology"],"options":{"tone":"casual"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let v = json_body(resp).await;
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Quantum Computing Explained");
    assert_eq!(items[0]["slug"], "quantum-computing-explained");
    assert_eq!(items[0]["isGenerated"], true);
    assert_eq!(items[0]["sourceTopic"]["keyword"], "Quantum Computing");
}

#[tokio::test]
async fn negative_max_articles_is_400() {
    let resp = app(None)
        .oneshot(post_json(
            "/api/admin/articles/generate",
            r#"{"maxArticles":-1}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let v = json_body(resp).await;
    assert!(v["error"].as_str().unwrap().contains("maxArticles"));
}

#[tokio::test]
async fn store_outage_is_503() {
    let resp = app_with(Arc::new(DownStore), None)
        .oneshot(post_json("/api/admin/articles/generate", r#"{"maxArticles":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
