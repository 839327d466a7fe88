//! Integration tests for the classification and persistence calls

mod common;

use common::{product_card, test_config, FakeSite};
use page_harvest::config::Config;
use page_harvest::crawler::Coordinator;
use page_harvest::delivery::DeliveryOutcome;
use page_harvest::model::{CrawlReport, CrawlRequest};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn delivery_config(server: &MockServer) -> Config {
    let mut config = test_config();
    config.delivery.classify_endpoint = Some(format!("{}/classify", server.uri()));
    config.delivery.save_endpoint = Some(format!("{}/save", server.uri()));
    config.delivery.classify_fallback = true;
    config.delivery.timeout_ms = 5_000;
    config
}

fn request(url: &str) -> CrawlRequest {
    CrawlRequest {
        url: url.to_string(),
        website_id: Some("site-7".to_string()),
        chatbot_id: Some("bot-9".to_string()),
    }
}

async fn bodies_at(server: &MockServer, at: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == at)
        .map(|req| serde_json::from_slice(&req.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_save_posts_final_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/shop", server.uri());
    let html = format!(
        "{}{}{}",
        product_card("A", "9", "8", "/a"),
        product_card("B", "", "7", "/b"),
        product_card("C", "", "6", "/c"),
    );
    let site = FakeSite::new().with_page(seed.clone(), html);

    let coordinator = Coordinator::new(delivery_config(&server), site).unwrap();
    let report = coordinator.run(&request(&seed)).await;

    let CrawlReport::SinglePage(page) = &report else {
        panic!("expected a single-page report, got {:?}", report);
    };
    assert_eq!(
        page.delivery,
        Some(DeliveryOutcome::Delivered { http_status: 201 })
    );

    let saved = bodies_at(&server, "/save").await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["url"], seed);
    assert_eq!(saved[0]["website_id"], "site-7");
    assert_eq!(saved[0]["chatbot_id"], "bot-9");
    assert_eq!(saved[0]["content"]["products"].as_array().unwrap().len(), 3);
    assert_eq!(saved[0]["content"]["products"][0]["price"], "8");

    // Three products meet the threshold, so nothing was classified
    assert!(bodies_at(&server, "/classify").await.is_empty());
}

#[tokio::test]
async fn test_failed_save_keeps_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let seed = format!("{}/shop", server.uri());
    let site = FakeSite::new().with_page(seed.clone(), product_card("A", "", "1", "/a"));

    let coordinator = Coordinator::new(delivery_config(&server), site).unwrap();
    let report = coordinator.run(&request(&seed)).await;

    assert_eq!(report.products().len(), 1);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["delivery"]["status"], "failed");
    assert!(json["delivery"]["reason"]
        .as_str()
        .unwrap()
        .contains("500"));
}

#[tokio::test]
async fn test_classifier_results_follow_local_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [
                { "name": "Local dup", "url": "/a" },
                { "name": "Remote", "price": "5", "url": "/remote", "image": "//cdn.example/r.png" },
                { "price": "1", "url": "/nameless" }
            ],
            "articles": [
                { "title": "Remote post", "url": "/blog/remote" }
            ]
        })))
        .mount(&server)
        .await;

    let mut config = delivery_config(&server);
    config.delivery.save_endpoint = None;

    let seed = format!("{}/shop/", server.uri());
    let site = FakeSite::new().with_page(seed.clone(), product_card("Local", "", "3", "/a"));

    let coordinator = Coordinator::new(config, site).unwrap();
    let report = coordinator.run(&request(&seed)).await;

    let names: Vec<_> = report.products().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Local", "Remote"]);
    assert_eq!(
        report.products()[1].url,
        format!("{}/remote", server.uri())
    );
    assert_eq!(report.products()[1].image, "https://cdn.example/r.png");
    assert_eq!(report.articles().len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("delivery").is_none());

    let sent = bodies_at(&server, "/classify").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["website_id"], "site-7");
    assert!(sent[0]["content"]["innerHTML"]
        .as_str()
        .unwrap()
        .contains("Local"));
}

#[tokio::test]
async fn test_markup_sent_in_bounded_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "products": [] })))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = delivery_config(&server);
    config.delivery.save_endpoint = None;
    config.delivery.chunk_bytes = 1024;

    // 2500 bytes of text with multi-byte characters and no product cards
    let markup = format!("<p>{}</p>", "giá ".repeat(500));
    assert!(markup.len() > 2048 && markup.len() <= 3072);

    let seed = format!("{}/about", server.uri());
    let site = FakeSite::new().with_page(seed.clone(), markup.clone());

    let coordinator = Coordinator::new(config, site).unwrap();
    coordinator.run(&request(&seed)).await;

    let chunks: Vec<String> = bodies_at(&server, "/classify")
        .await
        .iter()
        .map(|body| body["content"]["innerHTML"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|chunk| chunk.len() <= 1024));
    assert_eq!(chunks.concat(), markup);
}

#[tokio::test]
async fn test_failing_classifier_chunk_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut config = delivery_config(&server);
    config.delivery.save_endpoint = None;

    let seed = format!("{}/shop", server.uri());
    let site = FakeSite::new().with_page(seed.clone(), product_card("Only", "", "1", "/only"));

    let coordinator = Coordinator::new(config, site).unwrap();
    let report = coordinator.run(&request(&seed)).await;

    let names: Vec<_> = report.products().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Only"]);
}
