//! Robots.txt handling module
//!
//! This module fetches a site's robots.txt once per crawl session and turns it
//! into a [`ParsedRobots`] policy. Retrieval problems never abort a session:
//!
//! - 2xx: the body is parsed
//! - 3xx: followed up to five hops while the target stays on the same host
//! - 4xx: the site has no robots file, everything is allowed
//! - 5xx, timeouts, connection failures, undecodable bodies: everything is
//!   allowed and the outcome is reported as unavailable

mod parser;

pub use parser::ParsedRobots;

use crate::url::{netloc, robots_url};
use reqwest::header::LOCATION;
use reqwest::Client;
use url::Url;

const MAX_ROBOTS_REDIRECTS: usize = 5;

/// How the robots policy for a session was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsStatus {
    /// robots.txt was retrieved and parsed
    Fetched,
    /// The server answered 4xx; treated as "no restrictions"
    Missing,
    /// The file could not be retrieved, or redirected off the host; crawling
    /// proceeds unrestricted
    Unavailable(String),
}

impl RobotsStatus {
    /// Returns true if the policy could not be retrieved
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Outcome of a robots.txt retrieval
#[derive(Debug, Clone)]
pub struct RobotsFetch {
    pub policy: ParsedRobots,
    pub status: RobotsStatus,
}

impl RobotsFetch {
    fn unavailable(reason: String) -> Self {
        Self {
            policy: ParsedRobots::allow_all(),
            status: RobotsStatus::Unavailable(reason),
        }
    }
}

/// Fetches robots.txt for the site hosting `site`
///
/// The client's own timeout bounds the request.
///
/// # Arguments
///
/// * `client` - The HTTP client (carries the user agent and timeout)
/// * `site` - Any URL on the site; only scheme, host and port are used
///
/// # Returns
///
/// The policy together with how it was obtained. This function never fails.
pub async fn fetch_robots(client: &Client, site: &Url) -> RobotsFetch {
    let Some(location) = robots_url(site) else {
        return RobotsFetch::unavailable(format!("no host in {}", site));
    };

    let mut location = location;
    let mut hops = 0;

    let response = loop {
        tracing::debug!("Fetching {}", location);

        let response = match client.get(location.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                return RobotsFetch::unavailable(reason);
            }
        };

        if !response.status().is_redirection() {
            break response;
        }

        hops += 1;
        let target = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| location.join(v).ok());

        match target {
            Some(target) if hops <= MAX_ROBOTS_REDIRECTS && netloc(&target) == netloc(site) => {
                location = target;
            }
            _ => {
                return RobotsFetch::unavailable(format!(
                    "HTTP {} redirect not followed",
                    response.status().as_u16()
                ))
            }
        }
    };

    let status = response.status();

    if status.is_client_error() {
        tracing::debug!("{} answered {}, no restrictions", location, status.as_u16());
        return RobotsFetch {
            policy: ParsedRobots::allow_all(),
            status: RobotsStatus::Missing,
        };
    }

    if !status.is_success() {
        return RobotsFetch::unavailable(format!("HTTP {}", status.as_u16()));
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return RobotsFetch::unavailable(e.to_string()),
    };

    match String::from_utf8(bytes.to_vec()) {
        Ok(content) => RobotsFetch {
            policy: ParsedRobots::from_content(&content),
            status: RobotsStatus::Fetched,
        },
        Err(_) => RobotsFetch::unavailable("body is not valid UTF-8".to_string()),
    }
}
