//! URL handling module for Lodestone
//!
//! This module provides URL normalization and host/netloc helpers used by the
//! frontier, the scope gate and the robots fetcher.

mod domain;
mod normalize;

pub use domain::{extract_domain, netloc, robots_url};
pub use normalize::{normalize_parsed, normalize_url};
