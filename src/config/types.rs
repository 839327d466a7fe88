use serde::Deserialize;

/// Main configuration structure for Page-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawl bounding and pacing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of sitemap URLs rendered per crawl
    #[serde(rename = "max-urls")]
    pub max_urls: usize,

    /// Delay between two successive page renders (milliseconds)
    #[serde(rename = "page-delay-ms")]
    pub page_delay_ms: u64,

    /// Maximum nesting of sitemap indexes; the root sitemap is depth 0
    #[serde(rename = "max-sitemap-depth")]
    pub max_sitemap_depth: u32,

    /// Timeout for sitemap probe and fetch requests (milliseconds)
    #[serde(rename = "http-timeout-ms")]
    pub http_timeout_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_urls: 10,
            page_delay_ms: 1500,
            max_sitemap_depth: 4,
            http_timeout_ms: 30_000,
        }
    }
}

/// When a navigation is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitUntil {
    /// No new resource entries for a short quiet window
    NetworkIdle,
    /// `document.readyState` has left `loading`
    DomContentLoaded,
}

/// Browser session and render pipeline settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    pub headless: bool,

    /// Chrome/Chromium binary; auto-detected when absent
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<String>,

    #[serde(rename = "window-width")]
    pub window_width: u32,

    #[serde(rename = "window-height")]
    pub window_height: u32,

    #[serde(rename = "wait-until")]
    pub wait_until: WaitUntil,

    /// Upper bound for one navigation attempt (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    #[serde(rename = "max-navigation-attempts")]
    pub max_navigation_attempts: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    #[serde(rename = "scroll-step-px")]
    pub scroll_step_px: u32,

    #[serde(rename = "scroll-interval-ms")]
    pub scroll_interval_ms: u64,

    #[serde(rename = "max-scroll-steps")]
    pub max_scroll_steps: u32,

    /// Quiet period after scrolling, before the DOM is read
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    /// Abort pages that serve a CAPTCHA or bot challenge
    #[serde(rename = "detect-challenge")]
    pub detect_challenge: bool,

    /// Scroll to the bottom to materialize lazy-loaded content
    #[serde(rename = "lazy-load")]
    pub lazy_load: bool,

    /// Launch with automation fingerprint hardening flags
    pub stealth: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            headless: true,
            chrome_path: None,
            window_width: 1366,
            window_height: 900,
            wait_until: WaitUntil::NetworkIdle,
            navigation_timeout_ms: 60_000,
            max_navigation_attempts: 3,
            retry_backoff_ms: 2000,
            scroll_step_px: 100,
            scroll_interval_ms: 100,
            max_scroll_steps: 500,
            settle_ms: 2000,
            detect_challenge: true,
            lazy_load: true,
            stealth: true,
        }
    }
}

/// Remote classification / persistence service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    #[serde(rename = "classify-endpoint")]
    pub classify_endpoint: Option<String>,

    #[serde(rename = "save-endpoint")]
    pub save_endpoint: Option<String>,

    /// Send markup to the classifier when structural extraction under-yields
    #[serde(rename = "classify-fallback")]
    pub classify_fallback: bool,

    /// Classify when fewer products than this were extracted...
    #[serde(rename = "min-products")]
    pub min_products: usize,

    /// ...and fewer articles than this
    #[serde(rename = "min-articles")]
    pub min_articles: usize,

    /// Upper bound for one markup segment (bytes)
    #[serde(rename = "chunk-bytes")]
    pub chunk_bytes: usize,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            classify_endpoint: None,
            save_endpoint: None,
            classify_fallback: false,
            min_products: 3,
            min_articles: 1,
            chunk_bytes: 100_000,
            timeout_ms: 120_000,
        }
    }
}

impl DeliveryConfig {
    /// True when any outbound endpoint is configured
    pub fn is_enabled(&self) -> bool {
        self.classify_endpoint.is_some() || self.save_endpoint.is_some()
    }
}

/// HTTP front end
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}
