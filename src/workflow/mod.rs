pub mod company_ctx;
pub mod company_flow;

pub use company_ctx::CompanyCtx;
pub use company_flow::{CompanyFlow, CompanyOutcome};
