//! Chromium sessions over CDP using chromiumoxide

use super::{BrowserLauncher, BrowserSession, RenderError};
use crate::config::RendererConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Headers, SetExtraHttpHeadersParams};
use chromiumoxide::cdp::browser_protocol::page::SetBypassCspParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Launch flags that hide the most common automation fingerprints
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-features=IsolateOrigins,site-per-process",
];

/// Launches a fresh Chromium process per session
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

impl ChromiumLauncher {
    fn browser_config(config: &RendererConfig) -> Result<BrowserConfig, RenderError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.window_width, config.window_height)
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--lang={}", primary_language(&config.accept_language)));

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if config.stealth {
            for arg in STEALTH_ARGS {
                builder = builder.arg(*arg);
            }
        }

        builder.build().map_err(RenderError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(
        &self,
        config: &RendererConfig,
    ) -> Result<Box<dyn BrowserSession>, RenderError> {
        let browser_config = Self::browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler_task,
        };

        match prepare_page(&session.browser, config).await {
            Ok(page) => {
                session.page = Some(page);
                Ok(Box::new(session))
            }
            Err(e) => {
                let _ = Box::new(session).close().await;
                Err(e)
            }
        }
    }
}

/// Opens a blank page with the configured identity applied
async fn prepare_page(browser: &Browser, config: &RendererConfig) -> Result<Page, RenderError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| RenderError::Launch(format!("failed to open page: {}", e)))?;

    page.set_user_agent(config.user_agent.as_str())
        .await
        .map_err(|e| RenderError::Launch(format!("failed to set user agent: {}", e)))?;

    let headers = Headers::new(serde_json::json!({
        "Accept-Language": config.accept_language,
    }));
    page.execute(SetExtraHttpHeadersParams::new(headers))
        .await
        .map_err(|e| RenderError::Launch(format!("failed to set headers: {}", e)))?;

    page.execute(SetBypassCspParams::new(true))
        .await
        .map_err(|e| RenderError::Launch(format!("failed to bypass CSP: {}", e)))?;

    Ok(page)
}

/// First tag of an `Accept-Language` value, e.g. `en-US` from `en-US,en;q=0.9`
fn primary_language(accept_language: &str) -> &str {
    accept_language
        .split([',', ';'])
        .map(str::trim)
        .find(|tag| !tag.is_empty())
        .unwrap_or("en-US")
}

/// One Chromium process, its CDP event loop and one page
pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Script("session has no open page".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn goto(&self, url: &str) -> Result<(), RenderError> {
        self.page()?
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, RenderError> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;

        result
            .into_value()
            .map_err(|e| RenderError::Script(format!("failed to convert JS result: {:?}", e)))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
        } = *self;

        if let Some(page) = page {
            if let Err(e) = page.close().await {
                tracing::debug!("Page close failed: {}", e);
            }
        }

        let closed = browser.close().await.map(|_| ());
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        handler_task.abort();

        closed.map_err(|e| RenderError::Script(format!("failed to close browser: {}", e)))
    }
}
