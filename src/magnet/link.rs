use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

/// Longest raw magnet URI accepted; longer candidates are treated as noise
pub const MAX_MAGNET_LENGTH: usize = 2000;

const SCHEME_PREFIX: &str = "magnet:?";
const BTIH_PREFIX: &str = "urn:btih:";

/// Reasons a magnet candidate is discarded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MagnetError {
    #[error("not a magnet URI")]
    MissingScheme,

    #[error("magnet URI is {0} characters long")]
    TooLong(usize),

    #[error("no urn:btih exact topic")]
    MissingFingerprint,

    #[error("invalid info-hash '{0}'")]
    InvalidFingerprint(String),
}

/// Canonical info-hash of a magnet URI
///
/// Always upper case; two identifiers are the same content iff their
/// fingerprints are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parses a BitTorrent info-hash (32 to 40 ASCII alphanumerics)
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone::Fingerprint;
    ///
    /// let fp = Fingerprint::parse("aabbccddeeff00112233445566778899aabbccdd").unwrap();
    /// assert_eq!(fp.as_str(), "AABBCCDDEEFF00112233445566778899AABBCCDD");
    /// assert!(Fingerprint::parse("abc").is_none());
    /// ```
    pub fn parse(hash: &str) -> Option<Self> {
        let valid_length = (32..=40).contains(&hash.len());
        if valid_length && hash.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(Self(hash.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A parsed magnet URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    raw: String,
    fingerprint: Fingerprint,
    display_name: Option<String>,
    exact_length: Option<u64>,
    trackers: Vec<String>,
}

impl MagnetLink {
    /// Parses a raw magnet URI
    ///
    /// Only the first `xt=urn:btih:` topic is used. `dn` is percent and
    /// form decoded; an unparseable `xl` is ignored.
    ///
    /// # Returns
    ///
    /// * `Ok(MagnetLink)` - The URI carries a valid info-hash
    /// * `Err(MagnetError)` - The candidate is malformed
    pub fn parse(raw: &str) -> Result<Self, MagnetError> {
        let raw = raw.trim();

        if raw.len() > MAX_MAGNET_LENGTH {
            return Err(MagnetError::TooLong(raw.len()));
        }

        let has_scheme = raw
            .get(..SCHEME_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME_PREFIX));
        if !has_scheme {
            return Err(MagnetError::MissingScheme);
        }

        let query = &raw[SCHEME_PREFIX.len()..];
        let mut fingerprint: Option<Result<Fingerprint, MagnetError>> = None;
        let mut display_name = None;
        let mut exact_length = None;
        let mut trackers = Vec::new();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.to_ascii_lowercase().as_str() {
                "xt" if fingerprint.is_none() => {
                    let has_btih = value
                        .get(..BTIH_PREFIX.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BTIH_PREFIX));
                    if has_btih {
                        let hash = &value[BTIH_PREFIX.len()..];
                        fingerprint = Some(
                            Fingerprint::parse(hash)
                                .ok_or_else(|| MagnetError::InvalidFingerprint(hash.to_string())),
                        );
                    }
                }
                "dn" if display_name.is_none() => {
                    let name = value.trim();
                    if !name.is_empty() {
                        display_name = Some(name.to_string());
                    }
                }
                "xl" if exact_length.is_none() => exact_length = value.parse::<u64>().ok(),
                "tr" => trackers.push(value.into_owned()),
                _ => {}
            }
        }

        let fingerprint = fingerprint.ok_or(MagnetError::MissingFingerprint)??;

        Ok(Self {
            raw: raw.to_string(),
            fingerprint,
            display_name,
            exact_length,
            trackers,
        })
    }

    /// The URI as it was found
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Content size in bytes, when advertised
    pub fn exact_length(&self) -> Option<u64> {
        self.exact_length
    }

    pub fn trackers(&self) -> &[String] {
        &self.trackers
    }

    /// Display name, or the fingerprint when the URI has none
    pub fn label(&self) -> &str {
        self.display_name().unwrap_or(self.fingerprint.as_str())
    }

    /// Re-serializes the identifier with an upper-case fingerprint
    ///
    /// # Examples
    ///
    /// ```
    /// use lodestone::MagnetLink;
    ///
    /// let link = MagnetLink::parse(
    ///     "magnet:?xt=urn:btih:aabbccddeeff00112233445566778899aabbccdd&dn=Some%20Title",
    /// )
    /// .unwrap();
    /// assert_eq!(
    ///     link.canonical_uri(),
    ///     "magnet:?xt=urn:btih:AABBCCDDEEFF00112233445566778899AABBCCDD&dn=Some+Title"
    /// );
    /// ```
    pub fn canonical_uri(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());
        if let Some(name) = &self.display_name {
            params.append_pair("dn", name);
        }
        if let Some(length) = self.exact_length {
            params.append_pair("xl", &length.to_string());
        }
        for tracker in &self.trackers {
            params.append_pair("tr", tracker);
        }
        let params = params.finish();

        let mut uri = format!("{}xt={}{}", SCHEME_PREFIX, BTIH_PREFIX, self.fingerprint);
        if !params.is_empty() {
            uri.push('&');
            uri.push_str(&params);
        }
        uri
    }
}

impl fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
