use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                              AppleWebKit/537.36 (KHTML, like Gecko) \
                              Chrome/120.0.0.0 Safari/537.36";

/// Launch a headless browser that looks as little like automation as practical
pub async fn launch_headless_browser(chrome_executable: Option<&str>) -> AppResult<Browser> {
    info!("🚀 launching headless browser...");

    let user_agent_arg = format!("--user-agent={}", USER_AGENT);
    let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--window-size=1920,1080",
        "--lang=en-US,en;q=0.9",
        "--disable-blink-features=AutomationControlled",
        user_agent_arg.as_str(),
    ]);
    if let Some(executable) = chrome_executable {
        debug!("using browser executable {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let config = builder.build().map_err(|e| {
        error!("invalid headless browser config: {}", e);
        AppError::Browser(BrowserError::LaunchFailed(e))
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("headless browser launch failed: {}", e);
        AppError::Browser(BrowserError::LaunchFailed(e.to_string()))
    })?;
    debug!("headless browser started");

    // Drive the CDP event loop in the background
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    sleep(tokio::time::Duration::from_millis(300)).await;
    info!("✅ headless browser ready");

    Ok(browser)
}
