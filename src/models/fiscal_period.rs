use std::fmt;

use serde::{Deserialize, Serialize};

/// Year/quarter signals found in a link; either may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSignal {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
}

impl PeriodSignal {
    pub fn new(year: Option<i32>, quarter: Option<u8>) -> Self {
        Self { year, quarter }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// Rank the signal; a year without a quarter counts as Q4
    pub fn ranked(self) -> Option<FiscalPeriod> {
        self.year
            .map(|year| FiscalPeriod::new(year, self.quarter.unwrap_or(4)))
    }
}

/// A fully known reporting period, ordered by (year, quarter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: i32,
    pub quarter: u8,
}

impl FiscalPeriod {
    pub fn new(year: i32, quarter: u8) -> Self {
        Self { year, quarter }
    }

    /// Fallback when nothing on the site carries a date: year-end of `year`
    pub fn year_end(year: i32) -> Self {
        Self::new(year, 4)
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}
