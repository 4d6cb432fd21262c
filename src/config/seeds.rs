//! Seed site list loading
//!
//! The seed file holds one absolute site URL per line. Blank lines, `#`
//! comments and lines not starting with `http` are ignored.

use crate::ConfigError;
use std::path::Path;
use url::Url;

const EXAMPLE_SEED_FILE: &str = "\
# ======================================================
# SITES TO CRAWL
# One site URL per line.
# Lines starting with # are ignored.
# ======================================================
https://example.com/
";

/// Loads the ordered list of seed sites from a file
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - Seed URLs in file order, duplicates removed
/// * `Err(ConfigError::SeedFile)` - The file could not be read
pub fn load_seed_sites(path: &Path) -> Result<Vec<Url>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::SeedFile {
        path: path.display().to_string(),
        source,
    })?;

    let sites = parse_seed_sites(&content);
    tracing::info!("{} sites loaded from {}", sites.len(), path.display());
    Ok(sites)
}

/// Parses seed file content into a list of site URLs
pub fn parse_seed_sites(content: &str) -> Vec<Url> {
    let mut sites: Vec<Url> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || !line.starts_with("http") {
            continue;
        }

        match Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                if !sites.contains(&url) {
                    sites.push(url);
                }
            }
            Ok(url) => tracing::warn!("Ignoring seed with unsupported form: {}", url),
            Err(e) => tracing::warn!("Ignoring unparseable seed '{}': {}", line, e),
        }
    }

    sites
}

/// Writes a commented example seed file if none exists
///
/// # Returns
///
/// * `Ok(true)` - The example file was created
/// * `Ok(false)` - A seed file already exists and was left untouched
pub fn write_example_seed_file(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, EXAMPLE_SEED_FILE)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_non_http() {
        let content = "# comment\n\nhttps://a.test/\nftp://b.test/\nnot a url\n  http://c.test/page  \n";
        let sites = parse_seed_sites(content);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].as_str(), "https://a.test/");
        assert_eq!(sites[1].as_str(), "http://c.test/page");
    }

    #[test]
    fn test_parse_drops_duplicates_keeps_order() {
        let sites = parse_seed_sites("https://b.test/\nhttps://a.test/\nhttps://b.test/\n");
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].host_str(), Some("b.test"));
    }

    #[test]
    fn test_parse_ignores_malformed_http_line() {
        let sites = parse_seed_sites("http//missing-colon.test\nhttps://ok.test/\n");
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn test_missing_seed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let result = load_seed_sites(&dir.path().join("absent.txt"));
        assert!(matches!(result, Err(ConfigError::SeedFile { .. })));
    }

    #[test]
    fn test_write_example_seed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seeds.txt");

        assert!(write_example_seed_file(&path).unwrap());
        assert!(!write_example_seed_file(&path).unwrap());

        let sites = load_seed_sites(&path).unwrap();
        assert_eq!(sites.len(), 1);
    }
}
