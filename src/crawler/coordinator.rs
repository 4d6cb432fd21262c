//! Crawl coordinator - runs one session per seed site
//!
//! Sessions run sequentially. Between two sessions the coordinator pauses for
//! the configured site delay; a stop request cuts the pause short and ends the
//! run after the current session. The deduplicator and result sink are shared
//! by all sessions, so an identifier accepted on one site is known on the next.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::scheduler::{CrawlSession, Pipeline};
use crate::crawler::signal::StopSignal;
use crate::dedup::Deduplicator;
use crate::magnet::{Categorizer, QualityFilter};
use crate::output::{CrawlSummary, ResultSink, SessionReport};
use crate::robots::{fetch_robots, RobotsStatus};
use crate::scope::ScopeGate;
use crate::storage::{RunStatus, RunStore};
use crate::url::normalize_parsed;
use crate::Result;
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Main crawler structure
pub struct Crawler {
    config: Arc<Config>,
    client: Client,
    pipeline: Pipeline,
    stop: StopSignal,
    run_store: Option<Box<dyn RunStore + Send>>,
    config_hash: String,
}

impl Crawler {
    /// Creates a crawler for the given configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `dedup` - Fingerprint index, usually seeded from the history log
    /// * `sink` - Where accepted identifiers go
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(LodestoneError)` - The HTTP client could not be built
    pub fn new(config: Config, dedup: Arc<Deduplicator>, sink: Arc<dyn ResultSink>) -> Result<Self> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.crawler.fetch_timeout_secs),
        )?;

        let pipeline = Pipeline {
            dedup,
            sink,
            categorizer: Arc::new(Categorizer::new(&config.categories)),
            filter: Arc::new(QualityFilter::new(&config.filter.skip_keywords)),
        };

        Ok(Self {
            config: Arc::new(config),
            client,
            pipeline,
            stop: StopSignal::new(),
            run_store: None,
            config_hash: String::new(),
        })
    }

    /// Records the run and its sessions in `store`
    pub fn with_run_store(mut self, store: Box<dyn RunStore + Send>) -> Self {
        self.run_store = Some(store);
        self
    }

    /// Hash of the configuration file, stored with the run
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = hash.into();
        self
    }

    /// Uses an externally owned stop signal
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for requesting a stop
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Crawls a single site until its frontier drains or a stop is requested
    ///
    /// Fetches the site's robots.txt first; an unavailable policy is logged and
    /// recorded on the report but never aborts the session.
    ///
    /// # Returns
    ///
    /// * `Ok(SessionReport)` - The session ran
    /// * `Err(LodestoneError)` - The seed is not a crawlable http(s) URL
    pub async fn crawl_site(&self, site: &Url) -> Result<SessionReport> {
        let site = normalize_parsed(site.clone())?;
        let agent = &self.config.user_agent.name;
        let gate = ScopeGate::new(&site, self.config.scope.clone(), agent)?;

        let robots = fetch_robots(&self.client, &site).await;
        if let RobotsStatus::Unavailable(reason) = &robots.status {
            tracing::warn!(
                "robots.txt unavailable for {} ({}), crawling without restrictions",
                gate.netloc(),
                reason
            );
        }
        let robots_unavailable = robots.status.is_unavailable();
        let gate = gate.with_robots(robots.policy);

        let configured = Duration::from_millis(self.config.crawler.request_delay_ms);
        let delay = gate.effective_delay(configured);
        if delay > configured {
            tracing::info!(
                "Using crawl-delay of {:?} requested by {}",
                delay,
                gate.netloc()
            );
        }

        let session = CrawlSession::new(
            site,
            gate,
            Fetcher::new(self.client.clone(), delay),
            self.pipeline.clone(),
            self.stop.clone(),
        )
        .with_workers(
            self.config.crawler.workers as usize,
            Duration::from_millis(self.config.crawler.poll_interval_ms),
        )
        .with_robots_unavailable(robots_unavailable);

        Ok(session.run().await)
    }

    /// Runs one session per site, then finalizes the sink
    ///
    /// A seed that cannot be crawled is logged and skipped. Failing to record a
    /// session in the run store is logged but does not stop the run.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - All sessions ran, or the run was stopped
    /// * `Err(LodestoneError)` - The run could not be recorded or the reports
    ///   could not be written; in the latter case the run is stored as failed
    pub async fn run(&mut self, sites: &[Url]) -> Result<CrawlSummary> {
        let started_at = Utc::now();
        let run_id = match self.run_store.as_mut() {
            Some(store) => Some(store.create_run(&self.config_hash)?),
            None => None,
        };

        tracing::info!("Starting crawl of {} sites", sites.len());

        let site_delay = Duration::from_millis(self.config.crawler.site_delay_ms);
        let mut sessions = Vec::with_capacity(sites.len());

        for (index, site) in sites.iter().enumerate() {
            if self.stop.is_stopped() {
                break;
            }

            if index > 0 && !site_delay.is_zero() {
                tracing::debug!("Waiting {:?} before the next site", site_delay);
                tokio::select! {
                    _ = tokio::time::sleep(site_delay) => {}
                    _ = self.stop.stopped() => break,
                }
            }

            tracing::info!("Site {}/{}: {}", index + 1, sites.len(), site);

            let report = match self.crawl_site(site).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", site, e);
                    continue;
                }
            };

            if let (Some(store), Some(id)) = (self.run_store.as_mut(), run_id) {
                if let Err(e) = store.record_session(id, &report) {
                    tracing::warn!("Failed to record session for {}: {}", site, e);
                }
            }

            sessions.push(report);
        }

        let finalized = self.pipeline.sink.finalize();
        let interrupted = self.stop.is_stopped();

        if let (Some(store), Some(id)) = (self.run_store.as_mut(), run_id) {
            let status = match (&finalized, interrupted) {
                (Err(_), _) => RunStatus::Failed,
                (Ok(_), true) => RunStatus::Interrupted,
                (Ok(_), false) => RunStatus::Completed,
            };
            if let Err(e) = store.finish_run(id, status) {
                if finalized.is_ok() {
                    return Err(e.into());
                }
                tracing::error!("Failed to mark run {} as failed: {}", id, e);
            }
        }

        let categories = finalized?;

        let summary = CrawlSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            config_hash: self.config_hash.clone(),
            sessions,
            known_fingerprints: self.pipeline.dedup.len(),
            categories,
            interrupted,
        };

        tracing::info!(
            "Crawl finished: {} sites, {} pages, {} new identifiers",
            summary.sessions.len(),
            summary.total_pages(),
            summary.total_accepted()
        );

        Ok(summary)
    }
}
