//! Fiscal period extraction - business capability layer
//!
//! Finds year and quarter signals in a link's text, title and URL.

use chrono::Datelike;
use regex::Regex;

use crate::models::{DocumentLink, PeriodSignal};

/// Extracts year/quarter signals relative to a fixed current year.
///
/// Four-digit years are only accepted when they equal the current year or
/// the next one, and only next to a word boundary, a quarter marker or an
/// `fy` affix. Two-digit years are only read from fiscal-year idioms such as
/// `fy25`, `25fy` or `fy26q2`, and only for the same two years.
#[derive(Debug, Clone)]
pub struct PeriodExtractor {
    current_year: i32,
    full_year_patterns: Vec<Regex>,
    short_year_patterns: Vec<Regex>,
    /// Patterns capturing the quarter digit as `q`
    quarter_patterns: Vec<Regex>,
}

impl PeriodExtractor {
    pub fn new(current_year: i32) -> Self {
        let years = format!("({}|{})", current_year, current_year + 1);
        let short = format!(
            "({:02}|{:02})",
            current_year.rem_euclid(100),
            (current_year + 1).rem_euclid(100)
        );

        let full_year_patterns = [
            format!(r"\b{}\b", years),
            format!(r"{}[q\-]", years),
            format!(r"[q\-]{}", years),
            format!(r"fy{}", years),
            format!(r"{}fy", years),
        ];
        let short_year_patterns = [
            format!(r"fy{}\b", short),
            format!(r"\b{}fy\b", short),
            format!(r"fy{}[-\s]?q[1-4]\b", short),
            format!(r"q[1-4][-\s]?fy{}\b", short),
        ];
        let quarter_patterns = [
            r"\bq(?P<q>[1-4])\b".to_string(),
            format!(r"{}[-\s]?q(?P<q>[1-4])\b", years),
            format!(r"\bq(?P<q>[1-4])[-\s]?(?:fy)?{}", years),
            r"fy\d{2}[-\s]?q(?P<q>[1-4])\b".to_string(),
            r"\bq(?P<q>[1-4])[-\s]?fy\d{2}\b".to_string(),
        ];

        Self {
            current_year,
            full_year_patterns: compile_all(&full_year_patterns),
            short_year_patterns: compile_all(&short_year_patterns),
            quarter_patterns: compile_all(&quarter_patterns),
        }
    }

    /// Extractor for the local calendar year
    pub fn for_today() -> Self {
        Self::new(chrono::Local::now().year())
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Latest year and latest quarter found anywhere in the three fields.
    ///
    /// Year and quarter are maximised independently.
    pub fn extract(&self, text: &str, url: &str, title: &str) -> PeriodSignal {
        let combined = format!("{} {} {}", text, title, url).to_lowercase();
        let window = self.current_year..=self.current_year + 1;

        let full_years = self
            .full_year_patterns
            .iter()
            .flat_map(|re| re.captures_iter(&combined))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok());
        let short_years = self
            .short_year_patterns
            .iter()
            .flat_map(|re| re.captures_iter(&combined))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<i32>().ok())
            .filter_map(|yy| self.expand_short_year(yy));

        let year = full_years.chain(short_years).filter(|y| window.contains(y)).max();

        let quarter = self
            .quarter_patterns
            .iter()
            .flat_map(|re| re.captures_iter(&combined))
            .filter_map(|caps| caps.name("q")?.as_str().parse::<u8>().ok())
            .filter(|q| (1..=4).contains(q))
            .max();

        PeriodSignal::new(year, quarter)
    }

    /// `25` -> 2025 when the current year is 2025 (or 2024, as next year)
    fn expand_short_year(&self, yy: i32) -> Option<i32> {
        [self.current_year, self.current_year + 1]
            .into_iter()
            .find(|year| year.rem_euclid(100) == yy)
    }

    pub fn extract_link(&self, link: &DocumentLink) -> PeriodSignal {
        self.extract(&link.text, &link.href, &link.title)
    }
}

fn compile_all(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("invalid period pattern {}: {}", p, e);
                None
            }
        })
        .collect()
}
