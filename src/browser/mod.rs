pub mod connection;
pub mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_headless_browser;

use chromiumoxide::Browser;

use crate::config::Config;
use crate::error::AppResult;

/// Attach to a running Chrome when a debug port is configured, otherwise launch a headless one
pub async fn open_browser(config: &Config) -> AppResult<Browser> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser(port).await,
        None => launch_headless_browser(config.chrome_executable.as_deref()).await,
    }
}
