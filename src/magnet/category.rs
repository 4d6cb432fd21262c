use super::link::MagnetLink;
use crate::config::CategoryRule;
use std::fmt;

/// Label assigned to an identifier from its display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(String);

impl Category {
    /// Label used when no rule matches
    pub const OTHER: &'static str = "Other";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn other() -> Self {
        Self(Self::OTHER.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// File-name friendly form: lower case, spaces replaced by dashes
    pub fn slug(&self) -> String {
        self.0.trim().to_lowercase().replace(' ', "-")
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::other()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered keyword classifier; the first matching rule wins
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(Category, Vec<String>)>,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| {
                let keywords = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                (Category::new(rule.name.clone()), keywords)
            })
            .collect();
        Self { rules }
    }

    /// Categorizes a display name
    ///
    /// Keywords match as case-insensitive substrings.
    pub fn categorize_name(&self, name: &str) -> Category {
        let name = name.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(category, _)| category.clone())
            .unwrap_or_default()
    }

    /// Categorizes an identifier; one without a display name is `Other`
    pub fn categorize(&self, link: &MagnetLink) -> Category {
        match link.display_name() {
            Some(name) => self.categorize_name(name),
            None => Category::other(),
        }
    }
}

/// Drops identifiers whose display name contains an unwanted keyword
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    keywords: Vec<String>,
}

impl QualityFilter {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Returns the first keyword found in the identifier's display name
    ///
    /// Matching is by substring, so `cam` also catches `CAMRip`.
    pub fn rejects(&self, link: &MagnetLink) -> Option<&str> {
        let name = link.display_name()?.to_lowercase();
        self.keywords
            .iter()
            .find(|k| name.contains(k.as_str()))
            .map(String::as_str)
    }
}
