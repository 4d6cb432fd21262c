//! Per-site crawl session and its worker pool
//!
//! A [`CrawlSession`] owns the frontier and scope gate of one seed site and
//! drives N worker tasks over them. Workers share the frontier; each one loops
//! take -> policy check -> fetch -> extract -> offer links -> dedup -> emit
//! until the frontier is drained or a stop is requested.

use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::parse_page;
use crate::crawler::signal::StopSignal;
use crate::dedup::Deduplicator;
use crate::magnet::{Categorizer, MagnetLink, QualityFilter};
use crate::output::{ErrorCounts, ResultSink, SessionReport};
use crate::scope::ScopeGate;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Pieces shared by every session of a run
#[derive(Clone)]
pub struct Pipeline {
    pub dedup: Arc<Deduplicator>,
    pub sink: Arc<dyn ResultSink>,
    pub categorizer: Arc<Categorizer>,
    pub filter: Arc<QualityFilter>,
}

/// Live counters of one session, updated by all of its workers
#[derive(Debug, Default)]
struct SessionStats {
    pages_visited: AtomicU64,
    identifiers_found: AtomicU64,
    accepted: AtomicU64,
    already_known: AtomicU64,
    filtered: AtomicU64,
    policy_denied: AtomicU64,
    timeouts: AtomicU64,
    connection_errors: AtomicU64,
    http_errors: AtomicU64,
    non_html: AtomicU64,
    sink_failures: AtomicU64,
    interrupted: AtomicBool,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SessionStats {
    fn record_fetch_error(&self, error: &FetchError) {
        match error {
            FetchError::Timeout => bump(&self.timeouts),
            FetchError::Connection(_) => bump(&self.connection_errors),
            FetchError::HttpStatus { .. } => bump(&self.http_errors),
            FetchError::NonHtml { .. } => bump(&self.non_html),
            FetchError::BadRedirect(_) => bump(&self.http_errors),
            FetchError::RedirectDisallowed { .. } => bump(&self.policy_denied),
            FetchError::RedirectOutOfScope { .. } | FetchError::Stopped => {}
        }
    }

    fn to_report(&self, site: &Url, robots_unavailable: bool, elapsed: Duration) -> SessionReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        SessionReport {
            site: site.to_string(),
            pages_visited: load(&self.pages_visited),
            identifiers_found: load(&self.identifiers_found),
            accepted: load(&self.accepted),
            already_known: load(&self.already_known),
            filtered: load(&self.filtered),
            policy_denied: load(&self.policy_denied),
            errors: ErrorCounts {
                timeout: load(&self.timeouts),
                connection: load(&self.connection_errors),
                http_status: load(&self.http_errors),
                non_html: load(&self.non_html),
            },
            sink_failures: load(&self.sink_failures),
            robots_unavailable,
            interrupted: self.interrupted.load(Ordering::Relaxed),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Releases a taken URL when dropped, even if the worker panics
struct InFlight<'a>(&'a Frontier);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

struct Shared {
    frontier: Frontier,
    gate: ScopeGate,
    fetcher: Fetcher,
    pipeline: Pipeline,
    stats: SessionStats,
    stop: StopSignal,
    poll_interval: Duration,
}

impl Shared {
    fn halt(&self) {
        self.stats.interrupted.store(true, Ordering::Relaxed);
        let discarded = self.frontier.close();
        if discarded > 0 {
            tracing::info!("Discarded {} pending URLs", discarded);
        }
    }
}

/// Crawl of a single seed site
pub struct CrawlSession {
    site: Url,
    gate: ScopeGate,
    fetcher: Fetcher,
    pipeline: Pipeline,
    stop: StopSignal,
    workers: usize,
    poll_interval: Duration,
    robots_unavailable: bool,
}

impl CrawlSession {
    /// Creates a session for `site`
    ///
    /// # Arguments
    ///
    /// * `site` - Normalized seed URL, queued first
    /// * `gate` - Scope gate carrying the site's robots policy
    /// * `fetcher` - Fetcher with the session's effective delay
    /// * `pipeline` - Run-wide deduplicator, sink and classifiers
    /// * `stop` - Run-wide stop signal
    pub fn new(
        site: Url,
        gate: ScopeGate,
        fetcher: Fetcher,
        pipeline: Pipeline,
        stop: StopSignal,
    ) -> Self {
        Self {
            site,
            gate,
            fetcher,
            pipeline,
            stop,
            workers: 5,
            poll_interval: Duration::from_millis(1000),
            robots_unavailable: false,
        }
    }

    /// Sets the worker count and the idle poll interval
    pub fn with_workers(mut self, workers: usize, poll_interval: Duration) -> Self {
        self.workers = workers.max(1);
        self.poll_interval = poll_interval;
        self
    }

    /// Records that the site's robots policy could not be retrieved
    pub fn with_robots_unavailable(mut self, unavailable: bool) -> Self {
        self.robots_unavailable = unavailable;
        self
    }

    /// Runs the workers until the frontier drains or a stop is requested
    pub async fn run(self) -> SessionReport {
        let started = Instant::now();
        let shared = Arc::new(Shared {
            frontier: Frontier::new(),
            gate: self.gate,
            fetcher: self.fetcher,
            pipeline: self.pipeline,
            stats: SessionStats::default(),
            stop: self.stop,
            poll_interval: self.poll_interval,
        });

        shared.frontier.offer(self.site.clone());

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker_loop(id, Arc::clone(&shared)));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        if shared.stop.is_stopped() && !shared.frontier.is_drained() {
            shared.halt();
        }

        let report = shared
            .stats
            .to_report(&self.site, self.robots_unavailable, started.elapsed());

        tracing::info!(
            "Finished {}: {} pages, {} identifiers found, {} new",
            self.site,
            report.pages_visited,
            report.identifiers_found,
            report.accepted
        );

        report
    }
}

async fn worker_loop(id: usize, shared: Arc<Shared>) {
    tracing::debug!("Worker {} started", id);

    loop {
        if shared.stop.is_stopped() {
            shared.halt();
            break;
        }

        let Some(url) = shared.frontier.take(shared.poll_interval).await else {
            if shared.frontier.is_drained() || shared.stop.is_stopped() {
                break;
            }
            continue;
        };
        let _in_flight = InFlight(&shared.frontier);

        if shared.stop.is_stopped() {
            shared.halt();
            break;
        }

        process_url(&shared, &url).await;
    }

    tracing::debug!("Worker {} exiting", id);
}

async fn process_url(shared: &Shared, url: &Url) {
    if !shared.gate.is_allowed_by_policy(url) {
        tracing::info!("Disallowed by robots.txt: {}", url);
        bump(&shared.stats.policy_denied);
        return;
    }

    tracing::debug!("Fetching {}", url);

    let page = match shared.fetcher.fetch(url, &shared.gate, &shared.stop).await {
        Ok(page) => page,
        Err(FetchError::Stopped) => return,
        Err(e) => {
            bump(&shared.stats.pages_visited);
            match &e {
                FetchError::RedirectOutOfScope { .. } => {
                    tracing::debug!("Not following redirect from {}: {}", url, e)
                }
                FetchError::RedirectDisallowed { .. } => tracing::info!("{}: {}", url, e),
                _ => tracing::warn!("Failed to fetch {}: {}", url, e),
            }
            shared.stats.record_fetch_error(&e);
            return;
        }
    };
    bump(&shared.stats.pages_visited);

    let final_url = page.final_url;
    if final_url != *url {
        shared.frontier.mark_visited(&final_url);
    }

    let parsed = parse_page(&page.body, &final_url, &shared.gate);
    if let Some(title) = &parsed.title {
        tracing::debug!("{} - {}", final_url, title);
    }

    let queued = parsed
        .links
        .into_iter()
        .filter(|link| shared.frontier.offer(link.clone()))
        .count();
    if queued > 0 {
        tracing::debug!("Queued {} new URLs from {}", queued, final_url);
    }

    for link in &parsed.magnets {
        handle_identifier(shared, link);
    }
}

fn handle_identifier(shared: &Shared, link: &MagnetLink) {
    let stats = &shared.stats;
    let pipeline = &shared.pipeline;
    bump(&stats.identifiers_found);

    if let Some(keyword) = pipeline.filter.rejects(link) {
        tracing::debug!("Filtered '{}' (matched '{}')", link.label(), keyword);
        bump(&stats.filtered);
        return;
    }

    if !pipeline.dedup.accept(link) {
        bump(&stats.already_known);
        return;
    }

    let category = pipeline.categorizer.categorize(link);
    match pipeline.sink.emit(link, &category) {
        Ok(()) => {
            bump(&stats.accepted);
            tracing::info!("New [{}] {}", category, link.label());
        }
        Err(e) => {
            bump(&stats.sink_failures);
            tracing::error!("Failed to record {}: {}", link.fingerprint(), e);
        }
    }
}
