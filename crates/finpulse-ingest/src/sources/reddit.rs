//! Reddit keyword search over the public `search.json` listing.

use async_trait::async_trait;
use chrono::DateTime;
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use rand::seq::IndexedRandom;
use serde::Deserialize;

use super::http::{host_of, SourceHttp};
use super::{from_json, unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "reddit";
const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
const PAGE_LIMIT: &str = "25";
const MAX_SAMPLED_KEYWORDS: usize = 20;
const KEYWORDS_PER_QUERY: usize = 3;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<serde_json::Value>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    permalink: String,
    author: Option<String>,
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
}

pub struct RedditConnector {
    http: SourceHttp,
    base_url: String,
}

impl RedditConnector {
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

/// Group keywords into `"a" OR "b" OR "c"` search expressions.
fn chunk_queries(keywords: &[&String]) -> Vec<String> {
    keywords
        .chunks(KEYWORDS_PER_QUERY)
        .map(|chunk| {
            chunk
                .iter()
                .map(|k| format!("\"{k}\""))
                .collect::<Vec<_>>()
                .join(" OR ")
        })
        .collect()
}

fn is_removed(body: &str) -> bool {
    body.is_empty() || body == "[deleted]" || body == "[removed]"
}

#[async_trait]
impl SourceConnector for RedditConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::Reddit
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
        let sampled: Vec<&String> = vocabulary
            .keywords
            .choose_multiple(&mut rand::rng(), MAX_SAMPLED_KEYWORDS)
            .collect();
        Ok(chunk_queries(&sampled)
            .into_iter()
            .map(QueryShard::new)
            .collect())
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/search.json", self.base_url);
        let mut params = vec![
            ("q", shard.query.as_str()),
            ("sort", "new"),
            ("limit", PAGE_LIMIT),
        ];
        if let Some(after) = cursor.token.as_deref() {
            params.push(("after", after));
        }

        let listing: Listing = self.http.get_json(&url, &params).await?;

        let mut page = Page {
            next_cursor: listing.data.after.filter(|a| !a.is_empty()),
            ..Page::default()
        };
        for mut child in listing.data.children {
            match child.get_mut("data").map(serde_json::Value::take) {
                Some(data) => page.items.push(RawItem::Reddit(data)),
                None => page
                    .parse_failures
                    .push(ItemParseError::new(NAME, "listing child without data")),
            }
        }
        Ok(page)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::Reddit(value) = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let post: RedditPost = from_json(NAME, value)?;

        let title = post.title.trim().to_string();
        if title.is_empty() {
            return Err(ItemParseError::new(NAME, format!("post {} has no title", post.id)));
        }
        let timestamp = DateTime::from_timestamp(post.created_utc.trunc() as i64, 0)
            .ok_or_else(|| {
                ItemParseError::new(NAME, format!("created_utc out of range: {}", post.created_utc))
            })?;
        let body = post.selftext.trim();
        let body = if is_removed(body) { "" } else { body };
        let classification_text = CandidatePost::headline_with_body(&title, body);
        let content = if body.is_empty() {
            title.clone()
        } else {
            body.to_string()
        };

        Ok(CandidatePost {
            natural_id: NaturalId::Native(post.id),
            title,
            content,
            url: format!("https://reddit.com{}", post.permalink),
            author: post.author.unwrap_or_else(|| "Unknown".to_string()),
            timestamp,
            platform: Platform::Reddit,
            source: "reddit".to_string(),
            metrics: Metrics {
                likes: post.score,
                comments: post.num_comments,
                shares: 0,
            },
            classification_text,
        })
    }
}
