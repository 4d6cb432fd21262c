//! Crawl scope enforcement
//!
//! A [`ScopeGate`] belongs to exactly one crawl session. It answers two
//! questions about a candidate URL:
//!
//! - Is it in scope? Same network location as the seed, http(s), no
//!   denylisted extension, within the URL and query length limits.
//! - Does the site's robots policy allow fetching it?

use crate::config::ScopeConfig;
use crate::robots::ParsedRobots;
use crate::url::netloc;
use crate::UrlError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Reason a URL was kept out of the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeViolation {
    /// Scheme other than http/https
    UnsupportedScheme(String),
    /// Host or port differs from the session's seed
    OtherHost(String),
    /// Path ends in a denylisted extension
    DeniedExtension(String),
    /// Whole URL exceeds the length limit
    UrlTooLong(usize),
    /// Query string exceeds the length limit
    QueryTooLong(usize),
}

impl fmt::Display for ScopeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported scheme '{}'", scheme),
            Self::OtherHost(host) => write!(f, "outside the session host ({})", host),
            Self::DeniedExtension(ext) => write!(f, "denied extension {}", ext),
            Self::UrlTooLong(len) => write!(f, "URL too long ({} chars)", len),
            Self::QueryTooLong(len) => write!(f, "query too long ({} chars)", len),
        }
    }
}

/// Per-session scope and robots policy
#[derive(Debug, Clone)]
pub struct ScopeGate {
    netloc: String,
    limits: ScopeConfig,
    robots: ParsedRobots,
    user_agent: String,
}

impl ScopeGate {
    /// Creates a gate for the site hosting `base`
    ///
    /// The robots policy starts permissive; see [`ScopeGate::with_robots`].
    ///
    /// # Arguments
    ///
    /// * `base` - The session's seed URL
    /// * `limits` - Length limits and extension denylist
    /// * `user_agent` - Product token used for robots group matching
    pub fn new(base: &Url, limits: ScopeConfig, user_agent: &str) -> Result<Self, UrlError> {
        let netloc = netloc(base).ok_or(UrlError::MissingDomain)?;
        let limits = ScopeConfig {
            denied_extensions: limits
                .denied_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            ..limits
        };

        Ok(Self {
            netloc,
            limits,
            robots: ParsedRobots::allow_all(),
            user_agent: user_agent.to_string(),
        })
    }

    /// Installs the robots policy fetched for this session
    pub fn with_robots(mut self, robots: ParsedRobots) -> Self {
        self.robots = robots;
        self
    }

    /// The `host[:port]` this gate admits
    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    /// Checks a URL against the scope rules
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The URL may enter the frontier
    /// * `Err(ScopeViolation)` - The first rule the URL breaks
    pub fn check_scope(&self, url: &Url) -> Result<(), ScopeViolation> {
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ScopeViolation::UnsupportedScheme(url.scheme().to_string()));
        }

        match netloc(url) {
            Some(other) if other == self.netloc => {}
            Some(other) => return Err(ScopeViolation::OtherHost(other)),
            None => return Err(ScopeViolation::OtherHost(String::new())),
        }

        let length = url.as_str().len();
        if length > self.limits.max_url_length {
            return Err(ScopeViolation::UrlTooLong(length));
        }

        if let Some(query) = url.query() {
            if query.len() > self.limits.max_query_length {
                return Err(ScopeViolation::QueryTooLong(query.len()));
            }
        }

        let path = url.path().to_lowercase();
        if let Some(ext) = self
            .limits
            .denied_extensions
            .iter()
            .find(|ext| path.ends_with(ext.as_str()))
        {
            return Err(ScopeViolation::DeniedExtension(ext.clone()));
        }

        Ok(())
    }

    /// Returns true if the URL passes every scope rule
    pub fn is_in_scope(&self, url: &Url) -> bool {
        self.check_scope(url).is_ok()
    }

    /// Returns true if the session's robots policy allows fetching the URL
    pub fn is_allowed_by_policy(&self, url: &Url) -> bool {
        self.robots.is_allowed(url, &self.user_agent)
    }

    /// Per-request delay for this session
    ///
    /// A robots `Crawl-delay` longer than the configured delay replaces it.
    pub fn effective_delay(&self, configured: Duration) -> Duration {
        match self.robots.crawl_delay(&self.user_agent) {
            Some(requested) if requested > configured => requested,
            _ => configured,
        }
    }
}
