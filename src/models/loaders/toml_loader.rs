use std::path::Path;

use serde::Deserialize;
use tokio::fs;

use crate::error::{AppResult, FileError};
use crate::models::company::Company;

#[derive(Debug, Deserialize)]
struct Roster {
    #[serde(default)]
    companies: Vec<Company>,
}

/// Load the company roster from a TOML file with `[[companies]]` tables.
///
/// Entries without a name or IR URL are skipped with a warning.
pub async fn load_roster(path: &Path) -> AppResult<Vec<Company>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Err(FileError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;

    parse_roster(&content, path)
}

fn parse_roster(content: &str, path: &Path) -> AppResult<Vec<Company>> {
    let roster: Roster = toml::from_str(content).map_err(|source| FileError::TomlParseFailed {
        path: path.display().to_string(),
        source,
    })?;

    let mut companies = Vec::with_capacity(roster.companies.len());
    for company in roster.companies {
        if company.name.trim().is_empty() || company.ir_url.trim().is_empty() {
            tracing::warn!("⚠️ skipping roster entry without name or IR URL: {:?}", company);
            continue;
        }
        companies.push(company);
    }

    tracing::info!("✓ loaded {} companies from {}", companies.len(), path.display());
    Ok(companies)
}

/// Keep only the named companies; an empty filter keeps everyone
pub fn filter_roster(companies: Vec<Company>, names: &[String]) -> Vec<Company> {
    if names.is_empty() {
        return companies;
    }
    companies
        .into_iter()
        .filter(|c| names.iter().any(|n| n.eq_ignore_ascii_case(&c.name)))
        .collect()
}
