//! Orchestration layer
//!
//! ```text
//! batch_processor (Vec<Company>, worker pool, summary)
//!     ↓
//! company_processor (one company, task boundary, run record)
//!     ↓
//! workflow::CompanyFlow (crawl → extraction → download)
//!     ↓
//! services (crawler / extractor / downloader / recorder)
//!     ↓
//! infrastructure (renderer / retry / rate gate)
//! ```
//!
//! Only this layer owns the Browser and spawns tasks.

pub mod batch_processor;
pub mod company_processor;

pub use batch_processor::{process_all_companies, App, RunSummary};
pub use company_processor::{process_company, CompanyResult};
