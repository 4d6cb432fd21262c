//! Markdown summary generation
//!
//! This module renders a run summary as a markdown file: run metadata,
//! totals, a per-site table and the per-category breakdown.

use crate::output::stats::CrawlSummary;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Generates a markdown summary from a run summary
///
/// # Arguments
///
/// * `summary` - The crawl summary data
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Lodestone Crawl Summary\n\n");

    md.push_str("## Run Information\n\n");
    if let Some(run_id) = summary.run_id {
        md.push_str(&format!("- **Run ID**: {}\n", run_id));
    }
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {} seconds\n",
        summary.duration_seconds()
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if summary.interrupted {
            "interrupted"
        } else {
            "completed"
        }
    ));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    let errors = summary.total_errors();
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Sites**: {}\n", summary.sessions.len()));
    md.push_str(&format!("- **Pages Visited**: {}\n", summary.total_pages()));
    md.push_str(&format!(
        "- **Identifiers Found**: {}\n",
        summary.total_found()
    ));
    md.push_str(&format!(
        "- **New Identifiers**: {}\n",
        summary.total_accepted()
    ));
    md.push_str(&format!(
        "- **Already Known**: {}\n",
        summary.total_already_known()
    ));
    md.push_str(&format!(
        "- **Filtered by Keyword**: {}\n",
        summary.total_filtered()
    ));
    md.push_str(&format!(
        "- **Denied by robots.txt**: {}\n",
        summary.total_policy_denied()
    ));
    md.push_str(&format!("- **Fetch Errors**: {}\n", errors.total()));
    if summary.total_sink_failures() > 0 {
        md.push_str(&format!(
            "- **Write Failures**: {}\n",
            summary.total_sink_failures()
        ));
    }
    md.push_str(&format!(
        "- **Known Fingerprints**: {}\n\n",
        summary.known_fingerprints
    ));

    md.push_str("## Error Breakdown\n\n");
    md.push_str("| Class | Count |\n");
    md.push_str("|-------|-------|\n");
    md.push_str(&format!("| Timeout | {} |\n", errors.timeout));
    md.push_str(&format!("| Connection | {} |\n", errors.connection));
    md.push_str(&format!("| HTTP Status | {} |\n", errors.http_status));
    md.push_str(&format!("| Non-HTML | {} |\n\n", errors.non_html));

    if !summary.sessions.is_empty() {
        md.push_str("## Sites\n\n");
        md.push_str("| Site | Pages | Found | New | Known | Filtered | Denied | Errors | Notes |\n");
        md.push_str("|------|-------|-------|-----|-------|----------|--------|--------|-------|\n");
        for session in &summary.sessions {
            let mut notes = Vec::new();
            if session.robots_unavailable {
                notes.push("robots.txt unavailable");
            }
            if session.interrupted {
                notes.push("interrupted");
            }
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                session.site,
                session.pages_visited,
                session.identifiers_found,
                session.accepted,
                session.already_known,
                session.filtered,
                session.policy_denied,
                session.errors.total(),
                notes.join(", ")
            ));
        }
        md.push('\n');
    }

    if !summary.categories.is_empty() {
        md.push_str("## New Identifiers by Category\n\n");
        md.push_str("| Category | Count |\n");
        md.push_str("|----------|-------|\n");
        for (category, count) in &summary.categories {
            md.push_str(&format!("| {} | {} |\n", category, count));
        }
        md.push('\n');
    }

    md
}
