//! Outbound calls to the classification and persistence service
//!
//! Two calls share one HTTP client and one timeout:
//! - `classify` ships sanitized markup in byte-bounded chunks when structural
//!   extraction under-yields, and merges the records the service finds
//! - `save` posts the final records once per crawl
//!
//! Neither call can change or lose locally extracted records. Classification
//! failures are logged and skipped; the save call reports a [`DeliveryOutcome`].

use crate::config::DeliveryConfig;
use crate::extract::Extraction;
use crate::model::{ArticleRecord, CrawlRequest, ProductRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build delivery client: {0}")]
    Client(reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: reqwest::Error,
    },
}

/// Result of the save call, attached to the crawl report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered {
        #[serde(rename = "httpStatus")]
        http_status: u16,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Serialize)]
struct DeliveryPayload<'a, C> {
    url: &'a str,
    website_id: Option<&'a str>,
    chatbot_id: Option<&'a str>,
    content: C,
}

#[derive(Debug, Serialize)]
struct MarkupContent<'a> {
    #[serde(rename = "innerHTML")]
    inner_html: &'a str,
}

#[derive(Debug, Serialize)]
struct RecordsContent<'a> {
    products: &'a [ProductRecord],
    articles: &'a [ArticleRecord],
}

#[derive(Debug, Default, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    products: Vec<ProductRecord>,
    #[serde(default)]
    articles: Vec<ArticleRecord>,
}

/// Splits markup into pieces of at most `max_bytes` bytes
///
/// Pieces end on UTF-8 character boundaries. A single character wider than
/// `max_bytes` becomes its own piece.
pub fn chunk_markup(markup: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = markup;

    while !rest.is_empty() {
        let mut end = max_bytes.min(rest.len());
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }

        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }

    chunks
}

/// Client for the classification/persistence service
#[derive(Debug, Clone)]
pub struct DeliveryGateway {
    client: Client,
    config: DeliveryConfig,
}

impl DeliveryGateway {
    /// Builds a gateway, or `None` when no endpoint is configured
    pub fn from_config(config: &DeliveryConfig) -> Result<Option<Self>, DeliveryError> {
        if !config.is_enabled() {
            return Ok(None);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Some(Self {
            client,
            config: config.clone(),
        }))
    }

    /// True when this page's extraction should be sent for classification
    pub fn should_classify(&self, extraction: &Extraction) -> bool {
        self.config.classify_fallback
            && self.config.classify_endpoint.is_some()
            && extraction
                .under_yields(self.config.min_products, self.config.min_articles)
    }

    /// Sends markup for classification and returns the records found
    ///
    /// Each chunk is posted separately; records from all successful chunks
    /// are accumulated in chunk order. Failing chunks are logged and skipped.
    ///
    /// # Arguments
    ///
    /// * `request` - The crawl request, for its correlation ids
    /// * `page_url` - URL of the page the markup came from
    /// * `markup` - Sanitized page markup
    pub async fn classify(
        &self,
        request: &CrawlRequest,
        page_url: &str,
        markup: &str,
    ) -> Extraction {
        let mut found = Extraction::default();
        let Some(endpoint) = self.config.classify_endpoint.as_deref() else {
            return found;
        };

        let chunks = chunk_markup(markup, self.config.chunk_bytes);
        tracing::info!(
            "Sending {} for classification in {} chunk(s)",
            page_url,
            chunks.len()
        );

        for (index, chunk) in chunks.iter().enumerate() {
            let payload = DeliveryPayload {
                url: page_url,
                website_id: request.website_id.as_deref(),
                chatbot_id: request.chatbot_id.as_deref(),
                content: MarkupContent { inner_html: chunk },
            };

            match self.post_json::<_, ClassifyResponse>(endpoint, &payload).await {
                Ok(response) => {
                    tracing::debug!(
                        "Chunk {} of {} classified: {} products, {} articles",
                        index + 1,
                        page_url,
                        response.products.len(),
                        response.articles.len()
                    );
                    found.products.extend(response.products);
                    found.articles.extend(response.articles);
                }
                Err(e) => {
                    tracing::warn!("Classification of chunk {} failed: {}", index + 1, e);
                }
            }
        }

        found
    }

    /// Posts the final records, if a save endpoint is configured
    pub async fn save(
        &self,
        request: &CrawlRequest,
        products: &[ProductRecord],
        articles: &[ArticleRecord],
    ) -> Option<DeliveryOutcome> {
        let endpoint = self.config.save_endpoint.as_deref()?;

        let payload = DeliveryPayload {
            url: &request.url,
            website_id: request.website_id.as_deref(),
            chatbot_id: request.chatbot_id.as_deref(),
            content: RecordsContent { products, articles },
        };

        let outcome = match self.post(endpoint, &payload).await {
            Ok(status) => {
                tracing::info!(
                    "Delivered {} products and {} articles to {}",
                    products.len(),
                    articles.len(),
                    endpoint
                );
                DeliveryOutcome::Delivered {
                    http_status: status,
                }
            }
            Err(e) => {
                tracing::warn!("Delivery failed: {}", e);
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Some(outcome)
    }

    async fn send<P: Serialize>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<reqwest::Response, DeliveryError> {
        let response = self
            .client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|source| DeliveryError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }

    async fn post<P: Serialize>(&self, endpoint: &str, payload: &P) -> Result<u16, DeliveryError> {
        let response = self.send(endpoint, payload).await?;
        Ok(response.status().as_u16())
    }

    async fn post_json<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        payload: &P,
    ) -> Result<R, DeliveryError> {
        let response = self.send(endpoint, payload).await?;
        response
            .json::<R>()
            .await
            .map_err(|source| DeliveryError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}
