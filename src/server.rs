//! HTTP front end
//!
//! `GET /scrape?url=..&website_id=..&chatbot_id=..` runs one crawl and returns
//! its report; `GET /health` answers `{"status":"ok"}` and `GET /health/browser`
//! renders one page to prove the browser can launch. Crawls and browser checks
//! are serialized through a single permit, so at most one browser session is
//! open per process.

use crate::crawler::{check_target, Coordinator};
use crate::model::CrawlRequest;
use crate::render::PageSource;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// State shared by all handlers
pub struct AppState<S> {
    coordinator: Coordinator<S>,
    crawl_slot: Semaphore,
}

impl<S> AppState<S> {
    pub fn new(coordinator: Coordinator<S>) -> Self {
        Self {
            coordinator,
            crawl_slot: Semaphore::new(1),
        }
    }
}

/// Query string of `/scrape`
#[derive(Debug, Deserialize)]
pub struct ScrapeQuery {
    pub url: Option<String>,
    #[serde(default, alias = "websiteId")]
    pub website_id: Option<String>,
    #[serde(default, alias = "chatbotId")]
    pub chatbot_id: Option<String>,
}

/// Query string of `/health/browser`
#[derive(Debug, Deserialize)]
pub struct BrowserCheckQuery {
    pub url: Option<String>,
}

/// Page rendered by `/health/browser` when no `url` is given
pub const BROWSER_CHECK_PAGE: &str = "data:text/html,<title>page-harvest</title><p>ok</p>";

/// Build the axum Router with all endpoints.
pub fn router<S: PageSource + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/browser", get(browser_health::<S>))
        .route("/scrape", get(scrape::<S>))
        .with_state(state)
}

/// Start the HTTP server on the given address.
///
/// Runs until the listener fails or the process is stopped.
pub async fn start<S: PageSource + 'static>(
    bind: &str,
    state: Arc<AppState<S>>,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn scrape<S: PageSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ScrapeQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };

    let Some(url) = query.url.filter(|url| !url.trim().is_empty()) else {
        return bad_request("URL is required");
    };

    if let Err(reason) = check_target(&url) {
        return bad_request(&reason);
    }

    let request = CrawlRequest {
        url,
        website_id: query.website_id,
        chatbot_id: query.chatbot_id,
    };

    let Ok(_permit) = state.crawl_slot.acquire().await else {
        return shutting_down();
    };

    let report = state.coordinator.run(&request).await;
    Json(report).into_response()
}

async fn browser_health<S: PageSource + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<BrowserCheckQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(&rejection.body_text()),
    };

    let url = match query.url.filter(|url| !url.trim().is_empty()) {
        Some(url) => {
            if let Err(reason) = check_target(&url) {
                return bad_request(&reason);
            }
            url
        }
        None => BROWSER_CHECK_PAGE.to_string(),
    };

    let Ok(_permit) = state.crawl_slot.acquire().await else {
        return shutting_down();
    };

    let started = Instant::now();
    match state.coordinator.check_render(&url).await {
        Ok(markup_bytes) => Json(json!({
            "status": "success",
            "url": url,
            "markupBytes": markup_bytes,
            "elapsedMs": started.elapsed().as_millis() as u64,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Browser check against {} failed: {}", url, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "url": url, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn shutting_down() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "server is shutting down" })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
