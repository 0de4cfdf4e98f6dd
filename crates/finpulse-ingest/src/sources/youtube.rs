//! YouTube search results page, scraped for video ids.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use regex::Regex;

use super::http::{host_of, SourceHttp};
use super::{unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "youtube";
const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const MAX_QUERIES: usize = 10;
const MAX_VIDEOS_PER_QUERY: usize = 20;
/// Results filter: sort by upload date.
const SORT_BY_UPLOAD_DATE: &str = "CAI%3D";

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoId":"([a-zA-Z0-9_-]{11})""#).expect("valid video id regex")
});

pub struct YouTubeConnector {
    http: SourceHttp,
    base_url: String,
}

impl YouTubeConnector {
    #[must_use]
    pub fn new(http: SourceHttp) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Unique video ids in page order, capped at `limit`.
fn extract_video_ids(html: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    VIDEO_ID_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|id| seen.insert(id.clone()))
        .take(limit)
        .collect()
}

#[async_trait]
impl SourceConnector for YouTubeConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn rate_key(&self) -> String {
        host_of(&self.base_url)
    }

    fn plan(&self, vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError> {
        if vocabulary.keywords.is_empty() {
            return Err(ConnectorError::NoQueries {
                connector: NAME,
                reason: "keyword list is empty".to_string(),
            });
        }
        Ok(vocabulary
            .keywords
            .iter()
            .take(MAX_QUERIES)
            .map(QueryShard::new)
            .collect())
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/results", self.base_url);
        let params = [
            ("search_query", shard.query.as_str()),
            ("sp", SORT_BY_UPLOAD_DATE),
        ];
        let html = self.http.get_text(&url, &params).await?;

        Ok(Page {
            items: extract_video_ids(&html, MAX_VIDEOS_PER_QUERY)
                .into_iter()
                .map(|video_id| RawItem::YouTube {
                    video_id,
                    query: shard.query.clone(),
                })
                .collect(),
            ..Page::default()
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::YouTube { video_id, query } = item else {
            return Err(unexpected_item(NAME, &item));
        };

        Ok(CandidatePost {
            classification_text: format!("YouTube Video {video_id} about {query}"),
            title: format!("YouTube Video: {video_id}"),
            content: format!("Video discussion on {query}"),
            url: format!("https://youtu.be/{video_id}"),
            natural_id: NaturalId::Native(video_id),
            author: "YouTube".to_string(),
            timestamp: Utc::now(),
            platform: Platform::YouTube,
            source: "youtube".to_string(),
            metrics: Metrics::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_unique_ids_in_order() {
        let html = r#"{"videoId":"abcdefghijk"},{"videoId":"abcdefghijk"},{"videoId":"ZYX_wvu-123"},{"videoId":"short"}"#;
        assert_eq!(
            extract_video_ids(html, 20),
            vec!["abcdefghijk".to_string(), "ZYX_wvu-123".to_string()]
        );
    }

    #[test]
    fn id_extraction_respects_cap() {
        let html: String = (0..30)
            .map(|i| format!(r#""videoId":"vid{i:08}""#))
            .collect();
        assert_eq!(extract_video_ids(&html, 20).len(), 20);
    }

    #[test]
    fn normalize_builds_short_link_and_native_key() {
        let connector =
            YouTubeConnector::new(SourceHttp::new(5, "finpulse-test").expect("client"));
        let post = connector
            .normalize(RawItem::YouTube {
                video_id: "abcdefghijk".to_string(),
                query: "stock market".to_string(),
            })
            .expect("valid item");
        assert_eq!(post.url, "https://youtu.be/abcdefghijk");
        assert_eq!(post.content, "Video discussion on stock market");
        assert_eq!(
            post.classification_text,
            "YouTube Video abcdefghijk about stock market"
        );
        assert_eq!(post.canonical_key(), "yt_abcdefghijk");
    }
}
