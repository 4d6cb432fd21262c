//! Session reports and run summaries
//!
//! This module provides the per-session counters returned by every crawl
//! session, their aggregation into a run summary, and console rendering.

use crate::magnet::Category;
use crate::storage::RunRecord;
use chrono::{DateTime, Utc};

/// Fetch failures of one session, by class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub timeout: u64,
    pub connection: u64,
    pub http_status: u64,
    pub non_html: u64,
}

impl ErrorCounts {
    pub fn total(&self) -> u64 {
        self.timeout + self.connection + self.http_status + self.non_html
    }

    /// Adds another set of counts into this one
    pub fn merge(&mut self, other: &ErrorCounts) {
        self.timeout += other.timeout;
        self.connection += other.connection;
        self.http_status += other.http_status;
        self.non_html += other.non_html;
    }
}

/// Outcome of crawling one seed site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Seed URL of the session
    pub site: String,

    /// URLs taken from the frontier and fetched (successfully or not)
    pub pages_visited: u64,

    /// Valid identifiers found on fetched pages
    pub identifiers_found: u64,

    /// Identifiers accepted as new and emitted
    pub accepted: u64,

    /// Identifiers whose fingerprint was already known
    pub already_known: u64,

    /// Identifiers dropped by the quality keyword filter
    pub filtered: u64,

    /// URLs skipped because robots.txt disallows them
    pub policy_denied: u64,

    pub errors: ErrorCounts,

    /// Accepted identifiers that could not be written out
    pub sink_failures: u64,

    /// robots.txt could not be retrieved; the session ran unrestricted
    pub robots_unavailable: bool,

    /// The session was cut short by a stop request
    pub interrupted: bool,

    pub elapsed_ms: u64,
}

/// Aggregate of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub run_id: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub sessions: Vec<SessionReport>,

    /// Size of the fingerprint index at the end of the run
    pub known_fingerprints: usize,

    /// Identifiers emitted this run, per category
    pub categories: Vec<(Category, usize)>,

    pub interrupted: bool,
}

impl CrawlSummary {
    pub fn duration_seconds(&self) -> u64 {
        (self.finished_at - self.started_at).num_seconds().max(0) as u64
    }

    pub fn total_pages(&self) -> u64 {
        self.sessions.iter().map(|s| s.pages_visited).sum()
    }

    pub fn total_found(&self) -> u64 {
        self.sessions.iter().map(|s| s.identifiers_found).sum()
    }

    pub fn total_accepted(&self) -> u64 {
        self.sessions.iter().map(|s| s.accepted).sum()
    }

    pub fn total_already_known(&self) -> u64 {
        self.sessions.iter().map(|s| s.already_known).sum()
    }

    pub fn total_filtered(&self) -> u64 {
        self.sessions.iter().map(|s| s.filtered).sum()
    }

    pub fn total_policy_denied(&self) -> u64 {
        self.sessions.iter().map(|s| s.policy_denied).sum()
    }

    pub fn total_sink_failures(&self) -> u64 {
        self.sessions.iter().map(|s| s.sink_failures).sum()
    }

    pub fn total_errors(&self) -> ErrorCounts {
        let mut totals = ErrorCounts::default();
        for session in &self.sessions {
            totals.merge(&session.errors);
        }
        totals
    }

    /// Seeds whose robots.txt could not be retrieved
    pub fn robots_unavailable_sites(&self) -> Vec<&str> {
        self.sessions
            .iter()
            .filter(|s| s.robots_unavailable)
            .map(|s| s.site.as_str())
            .collect()
    }
}

/// Prints a run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!();
    println!("=== Crawl Summary ===\n");

    if summary.interrupted {
        println!("Run was interrupted before all sites were processed.\n");
    }

    println!(
        "{:<40} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "Site", "Pages", "Found", "New", "Known", "Errors"
    );
    for session in &summary.sessions {
        let mut site = session.site.clone();
        if site.len() > 40 {
            site.truncate(37);
            site.push_str("...");
        }
        println!(
            "{:<40} {:>7} {:>7} {:>7} {:>7} {:>7}",
            site,
            session.pages_visited,
            session.identifiers_found,
            session.accepted,
            session.already_known,
            session.errors.total()
        );
    }
    println!();

    let errors = summary.total_errors();
    println!("Totals:");
    println!("  Sites crawled: {}", summary.sessions.len());
    println!("  Pages visited: {}", summary.total_pages());
    println!("  Identifiers found: {}", summary.total_found());
    println!("  New identifiers: {}", summary.total_accepted());
    println!("  Already known: {}", summary.total_already_known());
    println!("  Filtered by keyword: {}", summary.total_filtered());
    println!("  Denied by robots.txt: {}", summary.total_policy_denied());
    println!(
        "  Fetch errors: {} (timeout {}, connection {}, HTTP {}, non-HTML {})",
        errors.total(),
        errors.timeout,
        errors.connection,
        errors.http_status,
        errors.non_html
    );
    println!("  Known fingerprints: {}", summary.known_fingerprints);
    println!("  Duration: {}s", summary.duration_seconds());

    if !summary.categories.is_empty() {
        println!();
        println!("New identifiers by category:");
        for (category, count) in &summary.categories {
            println!("  {}: {}", category, count);
        }
    }

    let unavailable = summary.robots_unavailable_sites();
    if !unavailable.is_empty() {
        println!();
        println!("robots.txt unavailable ({}):", unavailable.len());
        for site in unavailable {
            println!("  - {}", site);
        }
    }
}

/// Prints stored runs with their totals, newest first
pub fn print_run_history(runs: &[(RunRecord, Vec<SessionReport>)]) {
    println!("=== Run History ===\n");

    if runs.is_empty() {
        println!("No runs recorded yet.");
        return;
    }

    println!(
        "{:>5}  {:<25} {:<12} {:>6} {:>7} {:>7} {:>7}",
        "Run", "Started", "Status", "Sites", "Pages", "New", "Errors"
    );
    for (run, sessions) in runs {
        let pages: u64 = sessions.iter().map(|s| s.pages_visited).sum();
        let accepted: u64 = sessions.iter().map(|s| s.accepted).sum();
        let errors: u64 = sessions.iter().map(|s| s.errors.total()).sum();
        let started: String = run.started_at.chars().take(25).collect();

        println!(
            "{:>5}  {:<25} {:<12} {:>6} {:>7} {:>7} {:>7}",
            run.id,
            started,
            run.status.to_db_string(),
            sessions.len(),
            pages,
            accepted,
            errors
        );
    }
}
