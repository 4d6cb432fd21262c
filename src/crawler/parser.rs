//! HTML page parsing
//!
//! This module turns a fetched page into:
//! - In-scope links to follow (absolute, normalized, de-duplicated)
//! - The magnet identifiers found in the raw body
//! - The page title, for logging

use crate::magnet::{extract_magnets, MagnetLink};
use crate::scope::ScopeGate;
use crate::url::normalize_parsed;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Reference prefixes that never lead to a crawlable page
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "magnet:", "#"];

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// In-scope links in document order
    pub links: Vec<Url>,

    /// Identifiers found in the body, one per fingerprint
    pub magnets: Vec<MagnetLink>,
}

/// Parses a fetched page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href>` and `<area href>`
/// - `<link href>` except stylesheets and icons
/// - `<iframe src>` and `<frame src>`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:`, `data:` and `magnet:` references
/// - Fragment-only references
/// - Anything failing the session's scope rules
///
/// Relative references resolve against `<base href>` when present, else
/// against `page_url`.
///
/// # Arguments
///
/// * `body` - Raw HTML
/// * `page_url` - The URL the body was served from (after redirects)
/// * `gate` - The session's scope gate
///
/// # Example
///
/// ```
/// use lodestone::config::ScopeConfig;
/// use lodestone::crawler::parse_page;
/// use lodestone::ScopeGate;
/// use url::Url;
///
/// let page_url = Url::parse("https://site.test/").unwrap();
/// let gate = ScopeGate::new(&page_url, ScopeConfig::default(), "Lodestone").unwrap();
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
///
/// let parsed = parse_page(html, &page_url, &gate);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://site.test/page");
/// ```
pub fn parse_page(body: &str, page_url: &Url, gate: &ScopeGate) -> ParsedPage {
    let document = Html::parse_document(body);

    let title = extract_title(&document);
    let base = document_base(&document, page_url);
    let links = extract_links(&document, &base)
        .into_iter()
        .filter(|link| match gate.check_scope(link) {
            Ok(()) => true,
            Err(violation) => {
                tracing::trace!("Skipping {}: {}", link, violation);
                false
            }
        })
        .collect();

    ParsedPage {
        title,
        links,
        magnets: extract_magnets(body),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolves the document's `<base href>` against the page URL
fn document_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .filter(|base| base.scheme() == "http" || base.scheme() == "https")
        .unwrap_or_else(|| page_url.clone())
}

fn is_stylesheet_or_icon(element: &ElementRef<'_>) -> bool {
    element.value().attr("rel").is_some_and(|rel| {
        rel.split_ascii_whitespace().any(|token| {
            let token = token.to_ascii_lowercase();
            token == "stylesheet" || token.contains("icon")
        })
    })
}

/// Extracts every followable link, normalized and de-duplicated
fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let sources: [(&str, &str); 5] = [
        ("a[href]", "href"),
        ("area[href]", "href"),
        ("link[href]", "href"),
        ("iframe[src]", "src"),
        ("frame[src]", "src"),
    ];

    for (css, attribute) in sources {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };

        for element in document.select(&selector) {
            match element.value().name() {
                "a" if element.value().attr("download").is_some() => continue,
                "link" if is_stylesheet_or_icon(&element) => continue,
                _ => {}
            }

            let Some(reference) = element.value().attr(attribute) else {
                continue;
            };

            if let Some(url) = resolve_link(reference, base_url) {
                if seen.insert(url.clone()) {
                    links.push(url);
                }
            }
        }
    }

    links
}

/// Resolves a reference to a normalized absolute http(s) URL
///
/// Returns None if the reference should be excluded:
/// - empty, fragment-only or one of the skipped schemes
/// - unparseable, or not http(s) after resolution
fn resolve_link(reference: &str, base_url: &Url) -> Option<Url> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let lowered = reference.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return None;
    }

    let absolute = base_url.join(reference).ok()?;
    normalize_parsed(absolute).ok()
}
