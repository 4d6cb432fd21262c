//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - The per-request politeness delay, cut short by a stop request
//! - Manual redirect following, at most 10 hops, each hop checked against
//!   the session scope and robots policy before it is requested
//! - Error classification into [`FetchError`]
//!
//! Every URL gets exactly one attempt; there is no retry.

use crate::config::UserAgentConfig;
use crate::crawler::signal::StopSignal;
use crate::scope::ScopeGate;
use crate::url::normalize_parsed;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// A successfully retrieved HTML page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL that was requested
    pub url: Url,
    /// Normalized URL of the last redirect hop
    pub final_url: Url,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Why a URL yielded no page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP status {code}")]
    HttpStatus { code: u16 },

    #[error("not HTML (content-type: {content_type})")]
    NonHtml { content_type: String },

    /// The target was not requested
    #[error("redirect to {location} leaves scope: {reason}")]
    RedirectOutOfScope { location: String, reason: String },

    /// The target was not requested
    #[error("redirect to {location} is disallowed by robots.txt")]
    RedirectDisallowed { location: String },

    #[error("bad redirect: {0}")]
    BadRedirect(String),

    #[error("stopped before the request was sent")]
    Stopped,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed by the client; [`fetch_page`] follows them one
/// hop at a time.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use lodestone::config::UserAgentConfig;
/// use lodestone::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true for `text/html` and `application/xhtml+xml`, parameters ignored
pub fn is_html_content_type(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    media_type == "text/html" || media_type == "application/xhtml+xml"
}

fn classify_reqwest_error(e: &reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Connection(e.to_string())
    }
}

/// Resolves a redirect's `Location` against the URL that answered it
fn redirect_target(current: &Url, response: &reqwest::Response) -> Result<Url, FetchError> {
    let code = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| FetchError::BadRedirect(format!("HTTP {} without Location", code)))?;

    let target = current
        .join(location)
        .map_err(|e| FetchError::BadRedirect(format!("{}: {}", location, e)))?;

    normalize_parsed(target).map_err(|e| FetchError::BadRedirect(format!("{}: {}", location, e)))
}

/// Fetches one URL without delay, following redirects inside the gate's scope
///
/// A redirect target is requested only if it passes the gate's scope rules
/// and robots policy. A target that was already requested in the same chain
/// ends the chain as a loop.
///
/// # Returns
///
/// * `Ok(Page)` - 2xx response with an HTML content type
/// * `Err(FetchError)` - Anything else
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    gate: &ScopeGate,
) -> Result<Page, FetchError> {
    let mut current = url.clone();
    let mut chain = HashSet::from([url.clone()]);

    for _ in 0..=MAX_REDIRECTS {
        let response = client
            .get(current.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();

        if status.is_redirection() {
            let target = redirect_target(&current, &response)?;

            if let Err(violation) = gate.check_scope(&target) {
                return Err(FetchError::RedirectOutOfScope {
                    location: target.to_string(),
                    reason: violation.to_string(),
                });
            }
            if !gate.is_allowed_by_policy(&target) {
                return Err(FetchError::RedirectDisallowed {
                    location: target.to_string(),
                });
            }
            if !chain.insert(target.clone()) {
                return Err(FetchError::BadRedirect(format!("loop at {}", target)));
            }

            tracing::trace!("{} redirects to {}", current, target);
            current = target;
            continue;
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html_content_type(&content_type) {
            return Err(FetchError::NonHtml { content_type });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        return Ok(Page {
            url: url.clone(),
            final_url: current,
            status: status.as_u16(),
            content_type,
            body,
        });
    }

    Err(FetchError::BadRedirect(format!(
        "more than {} hops from {}",
        MAX_REDIRECTS, url
    )))
}

/// Per-session fetcher applying the politeness delay before each request
///
/// Each worker sleeps independently, so the aggregate request rate scales
/// with the number of workers.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, delay: Duration) -> Self {
        Self { client, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleeps the politeness delay, then fetches the URL
    ///
    /// A stop arriving during the delay returns [`FetchError::Stopped`]
    /// without sending anything.
    pub async fn fetch(
        &self,
        url: &Url,
        gate: &ScopeGate,
        stop: &StopSignal,
    ) -> Result<Page, FetchError> {
        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = stop.stopped() => return Err(FetchError::Stopped),
            }
        }
        if stop.is_stopped() {
            return Err(FetchError::Stopped);
        }
        fetch_page(&self.client, url, gate).await
    }
}
