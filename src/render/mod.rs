//! Page rendering through a headless browser
//!
//! This module turns a URL into de-noised markup. Each render:
//! - Launches one isolated browser session
//! - Navigates with a bounded retry loop and a per-attempt timeout
//! - Optionally aborts on CAPTCHA/challenge pages
//! - Optionally scrolls to the bottom so lazy content materializes
//! - Strips non-content elements and returns the body markup
//! - Closes the session on every exit path
//!
//! The browser sits behind the [`BrowserLauncher`]/[`BrowserSession`] traits;
//! [`chromium::ChromiumLauncher`] is the production implementation.

pub mod chromium;
mod scripts;

use crate::config::{RendererConfig, WaitUntil};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

pub use chromium::ChromiumLauncher;

/// Resource count must stay unchanged this long for the network to count as idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Poll interval while waiting for a load condition
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Markup fragments that only appear on bot-verification pages
const CHALLENGE_MARKERS: &[&str] = &[
    "cf-browser-verification",
    "cf_chl_opt",
    "checking your browser before accessing",
    "attention required! | cloudflare",
    "verify you are human",
    "captcha-form",
    "unusual traffic from your computer network",
    "px-captcha",
    "geo.captcha-delivery.com",
];

/// Rendering errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} failed after {attempts} attempts: {reason}")]
    NavigationExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("challenge page detected at {url} (marker: {marker})")]
    ChallengeDetected { url: String, marker: String },

    #[error("page script failed: {0}")]
    Script(String),
}

/// Sanitized markup of one rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

/// Anything that can turn a URL into rendered markup
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, RenderError>;
}

/// Starts isolated browser sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, config: &RendererConfig)
        -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// One browser with one open page
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the page to a URL
    async fn goto(&self, url: &str) -> Result<(), RenderError>;
    /// Evaluate an expression in the page and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, RenderError>;
    /// Tear down the page, the browser process and its event loop
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// Returns the first challenge marker found in the markup, if any
///
/// Matching is case-insensitive.
pub fn detect_challenge(html: &str) -> Option<&'static str> {
    let html = html.to_lowercase();
    CHALLENGE_MARKERS
        .iter()
        .copied()
        .find(|marker| html.contains(marker))
}

/// The render pipeline over a [`BrowserLauncher`]
pub struct PageRenderer<L> {
    launcher: L,
    config: RendererConfig,
}

impl<L: BrowserLauncher> PageRenderer<L> {
    pub fn new(launcher: L, config: RendererConfig) -> Self {
        Self { launcher, config }
    }

    async fn drive(&self, session: &dyn BrowserSession, url: &str) -> Result<String, RenderError> {
        self.navigate_with_retry(session, url).await?;

        if self.config.detect_challenge {
            let html = evaluate_string(session, scripts::OUTER_HTML).await?;
            if let Some(marker) = detect_challenge(&html) {
                return Err(RenderError::ChallengeDetected {
                    url: url.to_string(),
                    marker: marker.to_string(),
                });
            }
        }

        if self.config.lazy_load {
            self.trigger_lazy_load(session).await?;
        }

        evaluate_string(session, scripts::SANITIZE).await
    }

    /// Navigates, retrying on failure, timeout or a non-success status
    async fn navigate_with_retry(
        &self,
        session: &dyn BrowserSession,
        url: &str,
    ) -> Result<(), RenderError> {
        let attempts = self.config.max_navigation_attempts.max(1);
        let timeout = Duration::from_millis(self.config.navigation_timeout_ms);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            let outcome = tokio::time::timeout(timeout, self.navigate_once(session, url)).await;

            match outcome {
                Ok(Ok(())) => {
                    tracing::debug!("Loaded {} on attempt {}", url, attempt);
                    return Ok(());
                }
                Ok(Err(e)) => last_reason = e.to_string(),
                Err(_) => {
                    last_reason = format!("timed out after {}ms", self.config.navigation_timeout_ms)
                }
            }

            tracing::warn!(
                "Attempt {}/{} for {} failed: {}",
                attempt,
                attempts,
                url,
                last_reason
            );

            if attempt < attempts {
                tokio::time::sleep(backoff).await;
            }
        }

        Err(RenderError::NavigationExhausted {
            url: url.to_string(),
            attempts,
            reason: last_reason,
        })
    }

    async fn navigate_once(
        &self,
        session: &dyn BrowserSession,
        url: &str,
    ) -> Result<(), RenderError> {
        session.goto(url).await?;

        match self.config.wait_until {
            WaitUntil::NetworkIdle => wait_for_network_idle(session).await?,
            WaitUntil::DomContentLoaded => wait_for_dom_content(session).await?,
        }

        let status = session.evaluate(scripts::NAVIGATION_STATUS).await?;
        let status = status
            .as_u64()
            .or_else(|| status.as_f64().map(|s| s as u64))
            .unwrap_or(0);

        // 0 means the browser did not report a status
        if status != 0 && !(200..300).contains(&status) {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        Ok(())
    }

    /// Scrolls until the bottom is reached and the page stops growing
    async fn trigger_lazy_load(&self, session: &dyn BrowserSession) -> Result<(), RenderError> {
        let script = scripts::scroll_by(self.config.scroll_step_px);
        let interval = Duration::from_millis(self.config.scroll_interval_ms);
        let mut last_height: Option<f64> = None;
        let mut steps = 0;

        while steps < self.config.max_scroll_steps {
            steps += 1;
            let value = session.evaluate(&script).await?;
            let (bottom, height) = scroll_metrics(&value)?;

            if bottom >= height && last_height == Some(height) {
                break;
            }
            last_height = Some(height);

            tokio::time::sleep(interval).await;
        }

        tracing::debug!("Scrolled {} steps", steps);
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        Ok(())
    }
}

#[async_trait]
impl<L: BrowserLauncher> PageSource for PageRenderer<L> {
    async fn render(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let started = Instant::now();
        let session = self.launcher.launch(&self.config).await?;

        let result = self.drive(session.as_ref(), url).await;

        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close browser session for {}: {}", url, e);
        }

        let html = result?;
        tracing::info!(
            "Rendered {} ({} bytes, {}ms)",
            url,
            html.len(),
            started.elapsed().as_millis()
        );

        Ok(RenderedPage {
            url: url.to_string(),
            html,
        })
    }
}

async fn wait_for_dom_content(session: &dyn BrowserSession) -> Result<(), RenderError> {
    loop {
        let state = session.evaluate(scripts::READY_STATE).await?;
        if state.as_str().is_some_and(|s| s != "loading") {
            return Ok(());
        }
        tokio::time::sleep(LOAD_POLL_INTERVAL).await;
    }
}

async fn wait_for_network_idle(session: &dyn BrowserSession) -> Result<(), RenderError> {
    let mut last_count = None;
    let mut stable_since = Instant::now();

    loop {
        let count = session.evaluate(scripts::RESOURCE_COUNT).await?.as_u64();

        if count != last_count {
            last_count = count;
            stable_since = Instant::now();
        } else if stable_since.elapsed() >= NETWORK_IDLE_WINDOW {
            return Ok(());
        }

        tokio::time::sleep(LOAD_POLL_INTERVAL).await;
    }
}

async fn evaluate_string(
    session: &dyn BrowserSession,
    script: &str,
) -> Result<String, RenderError> {
    match session.evaluate(script).await? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(RenderError::Script(format!("expected a string, got {}", other))),
    }
}

fn scroll_metrics(value: &serde_json::Value) -> Result<(f64, f64), RenderError> {
    let pair = value
        .as_array()
        .and_then(|items| Some((items.first()?.as_f64()?, items.get(1)?.as_f64()?)));

    pair.ok_or_else(|| RenderError::Script(format!("unexpected scroll metrics {}", value)))
}
