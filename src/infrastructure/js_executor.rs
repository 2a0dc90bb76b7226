//! JS executor - infrastructure layer
//!
//! Holds one browser tab and only exposes "evaluate JavaScript" plus the two
//! page interactions a rendered IR page needs before its links can be read.

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// Clicks the first visible consent button; returns whether one was clicked
const ACCEPT_COOKIES_JS: &str = r#"
(() => {
    const wanted = ['accept all', 'accept', 'i agree', 'agree', 'consent', 'got it'];
    const candidates = Array.from(document.querySelectorAll('button, a[role="button"], a'));
    for (const el of candidates) {
        const label = (el.innerText || '').trim().toLowerCase();
        if (!label || label.length > 40) continue;
        if (wanted.some(w => label.includes(w)) && el.offsetParent !== null) {
            el.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Scrolls down in steps to trigger lazy-loaded link lists, then back to the top
const HUMAN_SCROLL_JS: &str = r#"
(async () => {
    const total = Math.max(document.body.scrollHeight, document.documentElement.scrollHeight);
    const viewport = window.innerHeight || document.documentElement.clientHeight;
    if (!total || !viewport) return 0;
    const steps = 2 + Math.floor(Math.random() * 2);
    const step = Math.max(Math.floor(total / (steps + 1)), Math.floor(viewport * 0.6));
    let current = 0;
    for (let i = 0; i < steps; i++) {
        current = Math.min(current + step, total);
        window.scrollTo(0, current);
        await new Promise(r => setTimeout(r, 400 + Math.random() * 600));
    }
    window.scrollTo(0, 0);
    return steps;
})()
"#;

/// Hides the automation flag before any page script runs
pub const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', {get: () => undefined});";

/// JS executor
///
/// - owns one Page
/// - exposes eval()
/// - knows nothing about companies or documents
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Evaluate JS and return the JSON result
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// Evaluate JS and deserialize the result
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// Best effort: dismiss a cookie banner
    pub async fn accept_cookies(&self) -> Result<bool> {
        self.eval_as(ACCEPT_COOKIES_JS).await
    }

    /// Best effort: scroll like a reader would
    pub async fn human_like_scroll(&self) -> Result<u32> {
        self.eval_as(HUMAN_SCROLL_JS).await
    }
}
