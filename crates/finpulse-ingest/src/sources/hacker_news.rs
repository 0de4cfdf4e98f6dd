//! Hacker News stories through the Algolia search API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use serde::Deserialize;

use super::http::{host_of, SourceHttp};
use super::{from_json, unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "hacker_news";
const DEFAULT_BASE_URL: &str = "https://hn.algolia.com";
const MAX_KEYWORDS: usize = 5;
const HITS_PER_PAGE: &str = "50";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    created_at_i: Option<i64>,
    points: Option<i64>,
    num_comments: Option<i64>,
}

pub struct HackerNewsConnector {
    http: SourceHttp,
    base_url: String,
}

impl HackerNewsConnector {
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

#[async_trait]
impl SourceConnector for HackerNewsConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::HackerNews
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
        let query = vocabulary
            .keywords
            .iter()
            .take(MAX_KEYWORDS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" OR ");
        Ok(vec![QueryShard::new(query)])
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/api/v1/search", self.base_url);
        let params = [
            ("query", shard.query.as_str()),
            ("tags", "story"),
            ("hitsPerPage", HITS_PER_PAGE),
        ];
        let response: SearchResponse = self.http.get_json(&url, &params).await?;

        Ok(Page {
            items: response.hits.into_iter().map(RawItem::HackerNews).collect(),
            ..Page::default()
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::HackerNews(value) = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let hit: Hit = from_json(NAME, value)?;

        let title = hit
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ItemParseError::new(NAME, format!("story {} has no title", hit.object_id)))?;
        let timestamp = hit
            .created_at_i
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        Ok(CandidatePost {
            url: format!("https://news.ycombinator.com/item?id={}", hit.object_id),
            natural_id: NaturalId::Native(hit.object_id),
            content: hit
                .url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| title.clone()),
            classification_text: title.clone(),
            title,
            author: hit.author.unwrap_or_else(|| "HN".to_string()),
            timestamp,
            platform: Platform::HackerNews,
            source: "hackernews".to_string(),
            metrics: Metrics {
                likes: hit.points.unwrap_or(0),
                comments: hit.num_comments.unwrap_or(0),
                shares: 0,
            },
        })
    }
}
