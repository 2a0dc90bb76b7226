//! Infrastructure layer
//!
//! Owns scarce resources (browser tabs, timing state) and only exposes capabilities.
//! Nothing here knows about companies, reports or fiscal quarters.

pub mod delay;
pub mod js_executor;
pub mod page_renderer;
pub mod rate_limiter;
pub mod retry;

pub use delay::RandomDelay;
pub use js_executor::JsExecutor;
pub use page_renderer::{parse_anchors, BrowserRenderer, PageRenderer, RawAnchor, RenderedPage};
pub use rate_limiter::MinIntervalGate;
pub use retry::RetryPolicy;
