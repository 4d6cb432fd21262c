//! Per-category report files
//!
//! Each non-empty category of a run gets `links-<category>.txt`:
//!
//! ```text
//! # Category: Movies
//! # Total links: 2
//! # Generated at: 2024-05-01 12:00:00
//!
//! magnet:?xt=urn:btih:...
//! magnet:?xt=urn:btih:...
//! ```

use crate::magnet::Category;
use crate::output::traits::OutputResult;
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of a category's report
pub fn category_report_name(category: &Category) -> String {
    format!("links-{}.txt", category.slug())
}

/// Formats a category report
pub fn format_category_report(
    category: &Category,
    links: &[String],
    generated_at: DateTime<Local>,
) -> String {
    let mut report = String::new();
    report.push_str(&format!("# Category: {}\n", category));
    report.push_str(&format!("# Total links: {}\n", links.len()));
    report.push_str(&format!(
        "# Generated at: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    for link in links {
        report.push_str(link);
        report.push('\n');
    }
    report
}

/// Writes a category report into `dir`, replacing any previous one
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written report
/// * `Err(OutputError)` - The file could not be written
pub fn write_category_report(
    dir: &Path,
    category: &Category,
    links: &[String],
    generated_at: DateTime<Local>,
) -> OutputResult<PathBuf> {
    let path = dir.join(category_report_name(category));
    let mut file = File::create(&path)?;
    file.write_all(format_category_report(category, links, generated_at).as_bytes())?;

    tracing::info!(
        "Category [{}] saved to {} with {} links",
        category,
        path.display(),
        links.len()
    );
    Ok(path)
}
