use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lodestone::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the network location (`host` or `host:port`) of a URL
///
/// The port is only included when it differs from the scheme's default, so
/// `http://a.test:80/` and `http://a.test/` share the netloc `a.test`.
pub fn netloc(url: &Url) -> Option<String> {
    let host = extract_domain(url)?;
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Builds the robots.txt location for the site hosting `url`
///
/// # Returns
///
/// * `Some(Url)` - `{scheme}://{host[:port]}/robots.txt`
/// * `None` - The URL has no host
pub fn robots_url(url: &Url) -> Option<Url> {
    let netloc = netloc(url)?;
    Url::parse(&format!("{}://{}/robots.txt", url.scheme(), netloc)).ok()
}
