use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::error::{AppError, AppResult, BrowserError};

/// Attach to a browser started with `--remote-debugging-port=<port>`
pub async fn connect_to_browser(port: u16) -> AppResult<Browser> {
    let browser_url = format!("http://localhost:{}", port);
    info!("connecting to browser at {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("could not connect to browser: {}", e);
        AppError::Browser(BrowserError::ConnectionFailed { port, source: e })
    })?;
    debug!("browser connected");

    // Drive the CDP event loop in the background
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // Let the browser state settle
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(browser)
}
