//! Canonical post records shared by the ingest pipeline and the store.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the hex digest kept for URL-derived canonical keys.
const URL_KEY_HEX_LEN: usize = 32;

/// Number of characters of the classified text kept as the summary.
pub const SUMMARY_LEN: usize = 100;

/// Upstream platform a post was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Reddit,
    #[serde(rename = "Google News")]
    GoogleNews,
    Facebook,
    Instagram,
    Web,
    YouTube,
    Mastodon,
    HackerNews,
    Medium,
    Lemmy,
}

impl Platform {
    /// Namespace prefix for canonical keys.
    ///
    /// Facebook and Instagram share `proxy` because both are collected through
    /// the same news-archive proxy and are keyed by the archived link.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            Platform::Reddit => "rd",
            Platform::GoogleNews => "news",
            Platform::Facebook | Platform::Instagram => "proxy",
            Platform::Web => "bs4",
            Platform::YouTube => "yt",
            Platform::Mastodon => "mstdn",
            Platform::HackerNews => "hn",
            Platform::Medium => "med",
            Platform::Lemmy => "lemmy",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "Reddit",
            Platform::GoogleNews => "Google News",
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
            Platform::Web => "Web",
            Platform::YouTube => "YouTube",
            Platform::Mastodon => "Mastodon",
            Platform::HackerNews => "HackerNews",
            Platform::Medium => "Medium",
            Platform::Lemmy => "Lemmy",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier a source hands us for an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalId {
    /// Source-native identifier (Reddit fullname suffix, HN object id, ...).
    Native(String),
    /// Content URL, used when the source exposes no stable id.
    Url(String),
}

impl NaturalId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            NaturalId::Native(id) | NaturalId::Url(id) => id,
        }
    }
}

/// Derive the deduplication key for an item.
///
/// Native ids are kept verbatim behind the platform prefix; URLs are hashed
/// with SHA-256 and truncated to 32 hex characters. The result depends only
/// on `(platform prefix, natural id)`.
#[must_use]
pub fn canonical_key(platform: Platform, natural_id: &NaturalId) -> String {
    let prefix = platform.key_prefix();
    match natural_id {
        NaturalId::Native(id) => format!("{prefix}_{}", id.trim()),
        NaturalId::Url(url) => {
            let digest = Sha256::digest(url.trim().as_bytes());
            let mut hex = String::with_capacity(URL_KEY_HEX_LEN);
            for byte in &digest[..URL_KEY_HEX_LEN / 2] {
                let _ = write!(hex, "{byte:02x}");
            }
            format!("{prefix}_{hex}")
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentClass {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentClass {
    /// Map a model label (`positive`, `NEGATIVE`, ...) to a class.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentClass::Positive),
            "negative" => Some(SentimentClass::Negative),
            "neutral" => Some(SentimentClass::Neutral),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentClass::Positive => "Positive",
            SentimentClass::Negative => "Negative",
            SentimentClass::Neutral => "Neutral",
        }
    }
}

impl std::fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gatekeeper verdict for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub is_relevant: bool,
    pub sentiment_class: SentimentClass,
    /// Probability of `sentiment_class`, in `[0, 1]`.
    pub confidence: f32,
    pub summary: String,
}

impl AnalysisResult {
    /// The verdict for off-topic text: neutral, zero confidence, no summary.
    #[must_use]
    pub fn rejected() -> Self {
        Self {
            is_relevant: false,
            sentiment_class: SentimentClass::Neutral,
            confidence: 0.0,
            summary: String::new(),
        }
    }

    #[must_use]
    pub fn accepted(text: &str, sentiment_class: SentimentClass, confidence: f32) -> Self {
        Self {
            is_relevant: true,
            sentiment_class,
            confidence: confidence.clamp(0.0, 1.0),
            summary: summarize(text),
        }
    }
}

/// First [`SUMMARY_LEN`] characters of `text`, with `...` when truncated.
#[must_use]
pub fn summarize(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    let prefix: String = chars.by_ref().take(SUMMARY_LEN).collect();
    if chars.next().is_some() {
        format!("{prefix}...")
    } else {
        prefix
    }
}

/// Canonical pre-classification record produced by a connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePost {
    #[serde(skip)]
    pub natural_id: NaturalId,
    pub title: String,
    pub content: String,
    pub url: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub platform: Platform,
    pub source: String,
    pub metrics: Metrics,
    /// Text the gatekeeper judges. Each connector picks the source text it
    /// trusts, so display decorations in `title` and `content` never reach
    /// the classifier.
    #[serde(skip)]
    pub classification_text: String,
}

impl CandidatePost {
    /// Join a headline and body for classification, dropping a body that is
    /// empty or only echoes the headline.
    #[must_use]
    pub fn headline_with_body(headline: &str, body: &str) -> String {
        let headline = headline.trim();
        let body = body.trim();
        if body.is_empty() || body == headline {
            headline.to_string()
        } else if headline.is_empty() {
            body.to_string()
        } else {
            format!("{headline} {body}")
        }
    }

    #[must_use]
    pub fn canonical_key(&self) -> String {
        canonical_key(self.platform, &self.natural_id)
    }
}

/// An accepted post ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPost {
    pub canonical_key: String,
    #[serde(flatten)]
    pub post: CandidatePost,
    pub analysis: AnalysisResult,
}

impl AnalyzedPost {
    /// Attach an analysis to a candidate, deriving the canonical key once.
    #[must_use]
    pub fn new(post: CandidatePost, analysis: AnalysisResult) -> Self {
        Self {
            canonical_key: post.canonical_key(),
            post,
            analysis,
        }
    }

    /// Names of required fields that are empty, for store-side validation.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.canonical_key.trim().is_empty() || self.post.natural_id.as_str().trim().is_empty()
        {
            missing.push("canonicalKey");
        }
        if self.post.title.trim().is_empty() {
            missing.push("title");
        }
        if self.post.url.trim().is_empty() {
            missing.push("url");
        }
        if self.post.source.trim().is_empty() {
            missing.push("source");
        }
        if !self.analysis.is_relevant {
            missing.push("analysis.isRelevant");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn candidate(natural_id: NaturalId, platform: Platform) -> CandidatePost {
        CandidatePost {
            natural_id,
            title: "Fed holds rates".to_string(),
            content: "The Federal Reserve kept interest rates unchanged.".to_string(),
            url: "https://example.com/fed".to_string(),
            author: "reporter".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            platform,
            source: "news".to_string(),
            metrics: Metrics::default(),
            classification_text: "Fed holds rates".to_string(),
        }
    }

    #[test]
    fn native_key_is_prefixed_verbatim() {
        let key = canonical_key(Platform::Reddit, &NaturalId::Native("1abcde".to_string()));
        assert_eq!(key, "rd_1abcde");
    }

    #[test]
    fn url_key_is_stable_and_hex() {
        let id = NaturalId::Url("https://example.com/article-1".to_string());
        let first = canonical_key(Platform::Medium, &id);
        let second = canonical_key(Platform::Medium, &id);
        assert_eq!(first, second);
        let hex = first.strip_prefix("med_").expect("med prefix");
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_id_on_different_platforms_does_not_collide() {
        let id = NaturalId::Native("42".to_string());
        assert_ne!(
            canonical_key(Platform::HackerNews, &id),
            canonical_key(Platform::Lemmy, &id)
        );
    }

    #[test]
    fn key_ignores_content_drift() {
        let mut a = candidate(NaturalId::Native("x1".to_string()), Platform::Reddit);
        let b = a.clone();
        a.title = "Completely different".to_string();
        a.metrics.likes = 999;
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn summary_truncates_long_text_on_char_boundary() {
        let text = "é".repeat(150);
        let summary = summarize(&text);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), SUMMARY_LEN + 3);
    }

    #[test]
    fn summary_keeps_short_text_whole() {
        assert_eq!(summarize("  short text  "), "short text");
    }

    #[test]
    fn rejected_analysis_is_neutral_with_zero_confidence() {
        let r = AnalysisResult::rejected();
        assert!(!r.is_relevant);
        assert_eq!(r.sentiment_class, SentimentClass::Neutral);
        assert!(r.confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn headline_with_body_skips_echoed_or_empty_body() {
        assert_eq!(
            CandidatePost::headline_with_body("Fed holds rates", " Fed holds rates "),
            "Fed holds rates"
        );
        assert_eq!(CandidatePost::headline_with_body("Fed holds rates", ""), "Fed holds rates");
        assert_eq!(
            CandidatePost::headline_with_body("Fed holds", "Markets shrug it off"),
            "Fed holds Markets shrug it off"
        );
    }

    #[test]
    fn classification_text_is_not_serialized() {
        let post = candidate(NaturalId::Native("1".to_string()), Platform::GoogleNews);
        let value = serde_json::to_value(&post).expect("serializable");
        assert!(value.get("classification_text").is_none());
        assert!(value.get("classificationText").is_none());
    }

    #[test]
    fn sentiment_labels_parse_case_insensitively() {
        assert_eq!(
            SentimentClass::from_label("POSITIVE"),
            Some(SentimentClass::Positive)
        );
        assert_eq!(
            SentimentClass::from_label(" negative "),
            Some(SentimentClass::Negative)
        );
        assert_eq!(SentimentClass::from_label("LABEL_2"), None);
    }

    #[test]
    fn analyzed_post_serializes_to_document_shape() {
        let post = candidate(NaturalId::Native("abc".to_string()), Platform::Reddit);
        let analyzed = AnalyzedPost::new(
            post,
            AnalysisResult::accepted("Fed holds rates", SentimentClass::Neutral, 0.7),
        );
        let doc = serde_json::to_value(&analyzed).unwrap();
        assert_eq!(doc["canonicalKey"], "rd_abc");
        assert_eq!(doc["platform"], "Reddit");
        assert_eq!(doc["metrics"]["likes"], 0);
        assert_eq!(doc["analysis"]["isRelevant"], true);
        assert_eq!(doc["analysis"]["sentimentClass"], "Neutral");
        assert!(doc.get("natural_id").is_none());
    }

    #[test]
    fn missing_fields_flags_empty_title_and_url() {
        let mut post = candidate(NaturalId::Native("abc".to_string()), Platform::Reddit);
        post.title = "  ".to_string();
        post.url = String::new();
        let analyzed = AnalyzedPost::new(post, AnalysisResult::rejected());
        let missing = analyzed.missing_fields();
        assert!(missing.contains(&"title"));
        assert!(missing.contains(&"url"));
        assert!(missing.contains(&"analysis.isRelevant"));
    }
}
