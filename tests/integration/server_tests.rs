//! Integration tests for the HTTP front end

mod common;

use common::{product_card, test_config, FakeSite};
use page_harvest::crawler::Coordinator;
use page_harvest::server::{router, AppState, BROWSER_CHECK_PAGE};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Serves the router on an ephemeral port and returns its base URL
async fn spawn_app(site: FakeSite) -> String {
    let coordinator = Coordinator::new(test_config(), site).unwrap();
    let app = router(Arc::new(AppState::new(coordinator)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health() {
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let base = spawn_app(FakeSite::new()).await;

    for query in ["", "?website_id=1", "?url="] {
        let response = reqwest::get(format!("{}/scrape{}", base, query))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "URL is required");
    }
}

#[tokio::test]
async fn test_relative_url_is_bad_request() {
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::get(format!("{}/scrape?url=shop.example", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid URL"));
}

#[tokio::test]
async fn test_unparsable_query_gets_json_error() {
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::get(format!(
        "{}/scrape?url=https://a.example/&url=https://b.example/",
        base
    ))
    .await
    .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn test_browser_health_renders_check_page() {
    let site = FakeSite::new().with_page(BROWSER_CHECK_PAGE, "<p>ok</p>");
    let rendered = site.rendered();
    let base = spawn_app(site).await;

    let response = reqwest::get(format!("{}/health/browser", base))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["markupBytes"], 9);
    assert_eq!(rendered.lock().unwrap().as_slice(), &[BROWSER_CHECK_PAGE.to_string()]);
}

#[tokio::test]
async fn test_browser_health_reports_render_failure() {
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{}/health/browser", base))
        .query(&[("url", "https://unreachable.example/")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("ERR_NAME_NOT_RESOLVED"));
}

#[tokio::test]
async fn test_browser_health_rejects_non_http_url() {
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{}/health/browser", base))
        .query(&[("url", "file:///etc/passwd")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_scrape_single_page() {
    let target = MockServer::start().await;
    let seed = format!("{}/", target.uri());
    let site = FakeSite::new().with_page(
        seed.clone(),
        format!(
            "{}{}",
            product_card("A", "100", "80", "/a"),
            product_card("B", "50", "40", "/b")
        ),
    );
    let base = spawn_app(site).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/scrape", base))
        .query(&[("url", seed.as_str()), ("websiteId", "7"), ("chatbotId", "9")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body.get("status").is_none());
    assert_eq!(body["url"], seed);
    assert_eq!(body["products"][0]["name"], "A");
    assert_eq!(body["products"][0]["price"], "80");
    assert_eq!(body["products"][1]["price"], "40");
}

#[tokio::test]
async fn test_render_failure_returns_error_body() {
    let target = MockServer::start().await;
    let base = spawn_app(FakeSite::new()).await;

    let response = reqwest::Client::new()
        .get(format!("{}/scrape", base))
        .query(&[("url", target.uri())])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
    assert!(body.get("products").is_none());
}

#[tokio::test]
async fn test_concurrent_scrapes_are_serialized() {
    let target = MockServer::start().await;
    let seed = target.uri();
    let site = FakeSite::new()
        .with_page(seed.clone(), product_card("A", "", "1", "/a"))
        .with_delay(Duration::from_millis(100));
    let peak: Arc<AtomicUsize> = site.peak_concurrency();
    let base = spawn_app(site).await;

    let client = reqwest::Client::new();
    let calls = (0..3).map(|_| {
        client
            .get(format!("{}/scrape", base))
            .query(&[("url", seed.as_str())])
            .send()
    });
    let responses = futures::future::join_all(calls).await;

    for response in responses {
        assert_eq!(response.unwrap().status(), 200);
    }
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
