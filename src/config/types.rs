use serde::Deserialize;

/// Main configuration structure for Lodestone
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub scope: ScopeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub filter: FilterConfig,
    #[serde(rename = "category")]
    pub categories: Vec<CategoryRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            scope: ScopeConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
            filter: FilterConfig::default(),
            categories: default_categories(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of concurrent workers per site session
    pub workers: u32,

    /// Delay each worker waits before every request (milliseconds)
    pub request_delay_ms: u64,

    /// Pause between two site sessions (milliseconds)
    pub site_delay_ms: u64,

    /// Per-request timeout (seconds)
    pub fetch_timeout_secs: u64,

    /// How long an idle worker waits on the frontier before re-checking for drain
    pub poll_interval_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            request_delay_ms: 1000,
            site_delay_ms: 5000,
            fetch_timeout_secs: 10,
            poll_interval_ms: 1000,
        }
    }
}

/// Limits on which discovered URLs are eligible for crawling
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScopeConfig {
    /// URLs longer than this are treated as crawler traps
    pub max_url_length: usize,

    /// Query strings longer than this are treated as crawler traps
    pub max_query_length: usize,

    /// Path suffixes that never lead to HTML pages
    pub denied_extensions: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            max_url_length: 250,
            max_query_length: 100,
            denied_extensions: DEFAULT_DENIED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Extensions skipped when no `denied-extensions` list is configured
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".ico", ".zip", ".rar",
    ".7z", ".tar", ".gz", ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".mp3", ".wav", ".flac",
    ".ogg", ".exe", ".msi", ".dmg", ".deb", ".rpm", ".css", ".js", ".json", ".xml", ".torrent",
];

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Product token, also used to match robots.txt groups
    pub name: String,

    /// Version of the crawler
    pub version: String,

    /// URL with information about the crawler
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "Lodestone".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!("{}/{} (+{})", self.name, self.version, contact),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// File listing the sites to crawl, one URL per line
    pub seeds_path: String,

    /// Append-only log of every identifier ever accepted
    pub history_path: String,

    /// Additional read-only identifier lists that count as already known
    pub extra_history: Vec<String>,

    /// Identifiers accepted during the current run (truncated at start)
    pub new_links_path: String,

    /// Directory receiving the per-category reports
    pub reports_dir: String,

    /// Path to the SQLite run history database
    pub database_path: String,

    /// Path to the markdown summary file
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            seeds_path: "base_busca.txt".to_string(),
            history_path: "links-magnetic-download.txt".to_string(),
            extra_history: vec!["links-baixados.txt".to_string()],
            new_links_path: "links-novos.txt".to_string(),
            reports_dir: ".".to_string(),
            database_path: "lodestone.db".to_string(),
            summary_path: "crawl-summary.md".to_string(),
        }
    }
}

/// Display-name keywords that mark an identifier as unwanted
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Case-insensitive substrings; any match drops the identifier
    pub skip_keywords: Vec<String>,
}

/// One categorization rule; rules are evaluated in file order
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRule {
    /// Category label
    pub name: String,

    /// Case-insensitive substrings of the display name selecting this category
    pub keywords: Vec<String>,
}

impl CategoryRule {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in category rules, in priority order
pub fn default_categories() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new("Dual-Audio", &["dual audio", "dual.audio", "dual-audio"]),
        CategoryRule::new("Dubbed", &["dublado", "dubbed", "dub", "pt-br", "pt br"]),
        CategoryRule::new("Subtitled", &["legendado", "subtitled", "leg"]),
        CategoryRule::new(
            "Movies",
            &["filme", "movie", "1080p", "720p", "bluray", "dvdrip", "x264", "x265"],
        ),
        CategoryRule::new(
            "Series",
            &["serie", "season", "s01", "s02", "temporada", "hdtv"],
        ),
        CategoryRule::new("Games", &["jogo", "game", "repack", "iso", "codex", "cpy"]),
        CategoryRule::new("Music", &["musica", "album", "mp3", "flac"]),
        CategoryRule::new("Software", &["software", "app", "windows", "ativador"]),
    ]
}
