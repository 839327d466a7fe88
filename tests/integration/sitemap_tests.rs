//! Integration tests for sitemap discovery and flattening

mod common;

use common::{sitemap_index, test_config, urlset};
use page_harvest::sitemap::{build_http_client, SitemapResolver};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(max_depth: u32) -> SitemapResolver {
    let client = build_http_client(&test_config()).unwrap();
    SitemapResolver::new(client, max_depth)
}

async fn serve_xml(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn pages(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://shop.example/{}/{}", prefix, i))
        .collect()
}

#[tokio::test]
async fn test_probe_finds_xml_sitemap() {
    let server = MockServer::start().await;
    serve_xml(&server, "/sitemap.xml", urlset(&pages("a", 1))).await;

    let resolver = resolver(4);
    let expected = format!("{}/sitemap.xml", server.uri());

    assert_eq!(resolver.probe_sitemap(&server.uri()).await, Some(expected.clone()));
    assert_eq!(
        resolver.probe_sitemap(&format!("{}/", server.uri())).await,
        Some(expected)
    );
}

#[tokio::test]
async fn test_probe_rejects_missing_and_non_xml() {
    let server = MockServer::start().await;
    let resolver = resolver(4);

    assert_eq!(resolver.probe_sitemap(&server.uri()).await, None);

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>soft 404</html>"))
        .mount(&server)
        .await;
    assert_eq!(resolver.probe_sitemap(&server.uri()).await, None);
}

#[tokio::test]
async fn test_probe_unreachable_host_is_absence() {
    let resolver = resolver(4);
    assert_eq!(resolver.probe_sitemap("http://127.0.0.1:1").await, None);
}

#[tokio::test]
async fn test_index_children_concatenated_in_order() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[
            format!("{}/products.xml", base),
            format!("{}/broken.xml", base),
            format!("{}/posts.xml", base),
        ]),
    )
    .await;
    serve_xml(&server, "/products.xml", urlset(&pages("p", 3))).await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    serve_xml(&server, "/posts.xml", urlset(&pages("blog", 2))).await;

    let urls = resolver(4)
        .resolve_urls(&format!("{}/sitemap.xml", base))
        .await;

    let mut expected = pages("p", 3);
    expected.extend(pages("blog", 2));
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_malformed_child_does_not_abort_siblings() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/bad.xml", base), format!("{}/good.xml", base)]),
    )
    .await;
    serve_xml(&server, "/bad.xml", "<?xml version=\"1.0\"?><rss></rss>".to_string()).await;
    serve_xml(&server, "/good.xml", urlset(&pages("g", 2))).await;

    let urls = resolver(4)
        .resolve_urls(&format!("{}/sitemap.xml", base))
        .await;
    assert_eq!(urls, pages("g", 2));
}

#[tokio::test]
async fn test_cyclic_index_terminates() {
    let server = MockServer::start().await;
    let base = server.uri();
    let root = format!("{}/sitemap.xml", base);

    serve_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/child.xml", base), root.clone()]),
    )
    .await;
    serve_xml(
        &server,
        "/child.xml",
        sitemap_index(&[root.clone(), format!("{}/leaf.xml", base)]),
    )
    .await;
    serve_xml(&server, "/leaf.xml", urlset(&pages("leaf", 2))).await;

    let urls = resolver(10).resolve_urls(&root).await;
    assert_eq!(urls, pages("leaf", 2));
}

#[tokio::test]
async fn test_depth_guard_skips_deep_branches() {
    let server = MockServer::start().await;
    let base = server.uri();

    serve_xml(
        &server,
        "/sitemap.xml",
        sitemap_index(&[format!("{}/level1.xml", base), format!("{}/shallow.xml", base)]),
    )
    .await;
    serve_xml(
        &server,
        "/level1.xml",
        sitemap_index(&[format!("{}/level2.xml", base)]),
    )
    .await;
    serve_xml(&server, "/level2.xml", urlset(&pages("deep", 1))).await;
    serve_xml(&server, "/shallow.xml", urlset(&pages("shallow", 1))).await;

    let root = format!("{}/sitemap.xml", base);

    assert_eq!(resolver(1).resolve_urls(&root).await, pages("shallow", 1));

    let mut all = pages("deep", 1);
    all.extend(pages("shallow", 1));
    assert_eq!(resolver(2).resolve_urls(&root).await, all);
}

#[tokio::test]
async fn test_duplicate_page_urls_preserved() {
    let server = MockServer::start().await;
    let mut urls = pages("x", 2);
    urls.push(urls[0].clone());
    serve_xml(&server, "/sitemap.xml", urlset(&urls)).await;

    let resolved = resolver(4)
        .resolve_urls(&format!("{}/sitemap.xml", server.uri()))
        .await;
    assert_eq!(resolved, urls);
}
