//! Company processing context
//!
//! Which company is being processed, and where it sits in the run

use std::fmt::Display;

use crate::models::Company;

#[derive(Debug, Clone)]
pub struct CompanyCtx {
    pub company: Company,

    /// Position in the roster, 1-based (only used for logs)
    pub company_index: usize,

    /// Roster size (only used for logs)
    pub total: usize,
}

impl CompanyCtx {
    pub fn new(company: Company, company_index: usize, total: usize) -> Self {
        Self {
            company,
            company_index,
            total,
        }
    }

    pub fn name(&self) -> &str {
        &self.company.name
    }

    /// Short prefix for crawl logs
    pub fn label(&self) -> String {
        format!("#{} {}", self.company_index, self.company.name)
    }
}

impl Display for CompanyCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[#{}/{} {} ({})]",
            self.company_index, self.total, self.company.name, self.company.ticker
        )
    }
}
