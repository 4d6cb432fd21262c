use super::link::MagnetLink;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static RE_MAGNET: OnceLock<Regex> = OnceLock::new();
static RE_AMPERSAND: OnceLock<Regex> = OnceLock::new();

fn magnet_pattern() -> &'static Regex {
    RE_MAGNET.get_or_init(|| {
        Regex::new(r#"(?i)magnet:\?[^\s"'<>]+"#).expect("magnet pattern is a valid regex")
    })
}

/// `&amp;`, `&#38;` and `&#x26;` in any letter case
fn escaped_ampersand() -> &'static Regex {
    RE_AMPERSAND.get_or_init(|| {
        Regex::new(r"(?i)&(?:amp|#0*38|#x0*26);").expect("ampersand pattern is a valid regex")
    })
}

/// Scans a page body for magnet URIs
///
/// Candidates end at whitespace, quotes or angle brackets. HTML-escaped
/// ampersands, named or numeric, are decoded before parsing so that URIs copied out of `href`
/// attributes keep all their parameters. Malformed candidates are dropped,
/// and a fingerprint seen earlier on the same page is skipped.
///
/// # Arguments
///
/// * `body` - Raw page content
///
/// # Returns
///
/// The valid identifiers in order of first appearance
pub fn extract_magnets(body: &str) -> Vec<MagnetLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for candidate in magnet_pattern().find_iter(body) {
        let decoded = escaped_ampersand().replace_all(candidate.as_str(), "&");

        match MagnetLink::parse(&decoded) {
            Ok(link) => {
                if seen.insert(link.fingerprint().clone()) {
                    links.push(link);
                }
            }
            Err(e) => tracing::trace!("Discarding magnet candidate: {}", e),
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const F1: &str = "0123456789abcdef0123456789abcdef01234567";
    const F2: &str = "fedcba9876543210fedcba9876543210fedcba98";

    #[test]
    fn test_extract_from_href() {
        let body = format!(
            r#"<a href="magnet:?xt=urn:btih:{}&amp;dn=First&amp;tr=udp%3A%2F%2Ft.test">x</a>"#,
            F1
        );
        let links = extract_magnets(&body);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].display_name(), Some("First"));
        assert_eq!(links[0].trackers().len(), 1);
        assert!(!links[0].raw().contains("&amp;"));
    }

    #[test]
    fn test_numeric_ampersand_entities_decoded() {
        let body = format!(
            r#"<a href="magnet:?xt=urn:btih:{}&#38;dn=Decimal&#x26;tr=udp%3A%2F%2Ft.test&#X26;tr=udp%3A%2F%2Fu.test">x</a>
               <a href="magnet:?xt=urn:btih:{}&AMP;dn=Upper">y</a>"#,
            F1, F2
        );
        let links = extract_magnets(&body);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].display_name(), Some("Decimal"));
        assert_eq!(links[0].trackers().len(), 2);
        assert!(!links[0].raw().contains("&#"));
        assert_eq!(links[1].display_name(), Some("Upper"));
    }

    #[test]
    fn test_extract_from_text_and_single_quotes() {
        let body = format!(
            "Grab it: magnet:?xt=urn:btih:{} now <a href='MAGNET:?xt=urn:btih:{}'>",
            F1, F2
        );
        let links = extract_magnets(&body);
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].fingerprint().as_str(), F2.to_uppercase());
    }

    #[test]
    fn test_same_fingerprint_first_occurrence_wins() {
        let body = format!(
            r#"<a href="magnet:?xt=urn:btih:{}&dn=Name.A">a</a>
               <a href="magnet:?xt=urn:btih:{}&dn=Name.B">b</a>"#,
            F1,
            F1.to_uppercase()
        );
        let links = extract_magnets(&body);

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].display_name(), Some("Name.A"));
    }

    #[test]
    fn test_malformed_candidates_dropped() {
        let body = format!(
            r#"<a href="magnet:?dn=nohash">a</a>
               <a href="magnet:?xt=urn:btih:short">b</a>
               <a href="magnet:?xt=urn:btih:{}">c</a>"#,
            F2
        );
        let links = extract_magnets(&body);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_no_magnets() {
        assert!(extract_magnets("<html><body>nothing here</body></html>").is_empty());
    }
}
