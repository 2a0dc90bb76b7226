//! Rendering capability: URL in, anchors of the rendered page out

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, Page};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{AppError, BrowserError};
use crate::infrastructure::js_executor::{JsExecutor, HIDE_WEBDRIVER_JS};

/// An `<a href>` element as found in the rendered DOM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAnchor {
    pub href: String,
    pub text: String,
    pub title: String,
    /// Outer HTML of the element
    pub html: String,
}

impl RawAnchor {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        let href = href.into();
        let text = text.into();
        let html = format!("<a href=\"{}\">{}</a>", href, text);
        Self {
            href,
            text,
            title: String::new(),
            html,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// Address the page ended up on (after redirects)
    pub url: String,
    pub anchors: Vec<RawAnchor>,
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render `url` and return its anchors. Errors are retryable.
    async fn render(&self, url: &str) -> Result<RenderedPage>;
}

/// Every `<a>` carrying an `href`, in document order
pub fn parse_anchors(html: &str) -> Vec<RawAnchor> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .map(|element| RawAnchor {
            href: element.value().attr("href").unwrap_or_default().trim().to_string(),
            text: collapse_whitespace(&element.text().collect::<String>()),
            title: element.value().attr("title").unwrap_or_default().trim().to_string(),
            html: element.html(),
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders pages in a real browser, one fresh tab per call.
///
/// The browser process is shared; tabs are not, so concurrent crawls never
/// touch each other's page state.
pub struct BrowserRenderer {
    browser: Arc<Browser>,
    navigation_timeout: Duration,
}

impl BrowserRenderer {
    pub fn new(browser: Arc<Browser>, navigation_timeout: Duration) -> Self {
        Self {
            browser,
            navigation_timeout,
        }
    }

    async fn render_in(&self, page: &Page, url: &str) -> Result<RenderedPage> {
        if let Err(e) = page
            .evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(HIDE_WEBDRIVER_JS))
            .await
        {
            debug!("could not install webdriver mask: {}", e);
        }

        match timeout(self.navigation_timeout, page.goto(url)).await {
            Err(_) => {
                return Err(AppError::Browser(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                    seconds: self.navigation_timeout.as_secs(),
                })
                .into())
            }
            Ok(Err(e)) => return Err(AppError::navigation_failed(url, e).into()),
            Ok(Ok(_)) => {}
        }

        let executor = JsExecutor::new(page.clone());
        match executor.accept_cookies().await {
            Ok(true) => debug!("cookie banner accepted on {}", url),
            Ok(false) => {}
            Err(e) => debug!("cookie banner check failed on {}: {}", url, e),
        }
        if let Err(e) = executor.human_like_scroll().await {
            debug!("scroll failed on {}: {}", url, e);
        }

        let html = page
            .content()
            .await
            .with_context(|| format!("reading rendered HTML of {}", url))?;
        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(RenderedPage {
            url: final_url,
            anchors: parse_anchors(&html),
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("opening browser tab")?;

        let result = self.render_in(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("closing tab for {} failed: {}", url, e);
        }
        result
    }
}
