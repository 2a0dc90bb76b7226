//! Logging helpers
//!
//! Subscriber setup, the run log file, and the banner-style progress lines.

use std::fs::{self, OpenOptions};
use std::io::Write;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::orchestrator::RunSummary;

/// Install the global subscriber; `RUST_LOG` overrides the default level
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn,hyper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Start a fresh run log with a timestamped header
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\nIR quarterly report run - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).with_context(|| format!("writing {}", log_file_path))?;
    Ok(())
}

pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 IR quarterly report pipeline starting");
    info!("📊 max concurrent companies: {}", config.max_concurrent_companies);
    info!("🕸️ crawl depth: {}, promising links: {}", config.crawl_max_depth, config.max_promising_links);
    info!("🏷️ document title lookup: {}", if config.resolve_document_titles { "on" } else { "off" });
    info!("🤖 extraction model: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

pub fn log_companies_loaded(total: usize, workers: usize) {
    info!("✓ {} company(ies) to process", total);
    info!("📋 running {} at a time\n", workers);
}

/// Summary lines shared by the console and the run log
pub fn summary_lines(summary: &RunSummary, metadata_dir: &str) -> Vec<String> {
    let mut lines = vec![
        "=".repeat(60),
        "📊 run summary".to_string(),
        format!("finished at: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")),
        format!("total runtime: {:.1}s", summary.elapsed.as_secs_f64()),
        "=".repeat(60),
        format!("✅ succeeded: {}/{}", summary.succeeded().count(), summary.total()),
        format!("❌ failed: {}", summary.failed().count()),
        format!(
            "📄 documents found: {}, reports extracted: {}, files downloaded: {} ({} failed)",
            summary.documents_found(),
            summary.reports_extracted(),
            summary.files_downloaded(),
            summary.files_failed()
        ),
    ];

    let succeeded: Vec<&str> = summary.succeeded().map(|r| r.company.as_str()).collect();
    if !succeeded.is_empty() {
        lines.push(format!("succeeded: {}", succeeded.join(", ")));
    }
    for result in summary.failed() {
        lines.push(format!(
            "failed: {} - {}",
            result.company,
            truncate_text(result.error.as_deref().unwrap_or("unknown error"), 200)
        ));
    }
    lines.push("=".repeat(60));
    lines.push(format!("metadata saved to: {}", metadata_dir));
    lines
}

pub fn print_final_summary(summary: &RunSummary, config: &Config) {
    for line in summary_lines(summary, &config.metadata_dir) {
        info!("{}", line);
    }
    info!("\nlog saved to: {}", config.output_log_file);
}

/// Append the summary to the run log
pub fn append_summary(log_file_path: &str, summary: &RunSummary, metadata_dir: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("opening {}", log_file_path))?;
    for line in summary_lines(summary, metadata_dir) {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

/// Shorten long text for log display
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
