//! Query vocabulary: search keywords and hashtags driving the connectors.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Keywords used when no vocabulary file is present.
pub const FALLBACK_KEYWORDS: &[&str] = &[
    "stock market",
    "inflation",
    "investing",
    "crypto",
    "economy",
];

/// Hashtags used when no vocabulary file is present.
pub const FALLBACK_HASHTAGS: &[&str] = &["stocks", "finance"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabularyOrigin {
    File,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryVocabulary {
    pub keywords: Vec<String>,
    pub hashtags: Vec<String>,
    pub origin: VocabularyOrigin,
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    keywords: Vec<String>,
    #[serde(default)]
    hashtags: Vec<String>,
}

impl QueryVocabulary {
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            keywords: FALLBACK_KEYWORDS.iter().map(ToString::to_string).collect(),
            hashtags: FALLBACK_HASHTAGS.iter().map(ToString::to_string).collect(),
            origin: VocabularyOrigin::Fallback,
        }
    }

    /// Build a vocabulary from in-memory lists, normalizing the same way the
    /// file loader does.
    #[must_use]
    pub fn new(keywords: Vec<String>, hashtags: Vec<String>) -> Self {
        Self {
            keywords: dedup_preserving_order(keywords.iter().map(|k| k.trim())),
            hashtags: dedup_preserving_order(hashtags.iter().map(|h| h.trim().trim_start_matches('#'))),
            origin: VocabularyOrigin::File,
        }
    }
}

/// Load the query vocabulary from a YAML file.
///
/// A missing file yields [`QueryVocabulary::fallback`]. Keywords are trimmed
/// and deduplicated case-insensitively, hashtags lose any leading `#`.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// contains no keywords.
pub fn load_vocabulary(path: &Path) -> Result<QueryVocabulary, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(QueryVocabulary::fallback());
        }
        Err(e) => {
            return Err(ConfigError::VocabularyFileIo {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    let file: VocabularyFile = serde_yaml::from_str(&content)?;
    let vocabulary = QueryVocabulary::new(file.keywords, file.hashtags);

    if vocabulary.keywords.is_empty() {
        return Err(ConfigError::Validation(format!(
            "vocabulary file {} lists no keywords",
            path.display()
        )));
    }

    Ok(vocabulary)
}

fn dedup_preserving_order<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .map(ToString::to_string)
        .collect()
}
