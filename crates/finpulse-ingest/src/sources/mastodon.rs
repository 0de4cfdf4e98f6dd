//! Mastodon public hashtag timelines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use serde::Deserialize;

use super::http::{encode_path_segment, host_of, SourceHttp};
use super::text::{html_to_text, truncate_chars};
use super::{from_json, unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "mastodon";
const DEFAULT_BASE_URL: &str = "https://mastodon.social";
const MAX_TAGS: usize = 10;
const PAGE_LIMIT: &str = "40";
const TITLE_CHARS: usize = 80;

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
    #[serde(default)]
    content: String,
    url: Option<String>,
    uri: Option<String>,
    #[serde(default)]
    account: Account,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    favourites_count: i64,
    #[serde(default)]
    replies_count: i64,
    #[serde(default)]
    reblogs_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Account {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    username: String,
}

pub struct MastodonConnector {
    http: SourceHttp,
    base_url: String,
}

impl MastodonConnector {
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
impl SourceConnector for MastodonConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn rate_key(&self) -> String {
        host_of(&self.base_url)
    }

    fn plan(&self, vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError> {
        if vocabulary.hashtags.is_empty() {
            return Err(ConnectorError::NoQueries {
                connector: NAME,
                reason: "hashtag list is empty".to_string(),
            });
        }
        Ok(vocabulary
            .hashtags
            .iter()
            .take(MAX_TAGS)
            .map(|tag| QueryShard::new(tag.trim_start_matches('#')))
            .collect())
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let tag = encode_path_segment(&shard.query);
        let url = format!("{}/api/v1/timelines/tag/{tag}", self.base_url);
        let statuses: Vec<serde_json::Value> =
            self.http.get_json(&url, &[("limit", PAGE_LIMIT)]).await?;

        Ok(Page {
            items: statuses.into_iter().map(RawItem::Mastodon).collect(),
            ..Page::default()
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::Mastodon(value) = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let status: Status = from_json(NAME, value)?;

        let content = html_to_text(&status.content);
        if content.is_empty() {
            return Err(ItemParseError::new(
                NAME,
                format!("status {} has no text content", status.id),
            ));
        }
        let url = status
            .url
            .or(status.uri)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ItemParseError::new(NAME, format!("status {} has no url", status.id)))?;
        let author = if status.account.display_name.trim().is_empty() {
            status.account.username
        } else {
            status.account.display_name
        };

        Ok(CandidatePost {
            natural_id: NaturalId::Native(status.id),
            title: format!("{}...", truncate_chars(&content, TITLE_CHARS)),
            classification_text: content.clone(),
            content,
            url,
            author,
            timestamp: status.created_at.unwrap_or_else(Utc::now),
            platform: Platform::Mastodon,
            source: "mastodon".to_string(),
            metrics: Metrics {
                likes: status.favourites_count,
                comments: status.replies_count,
                shares: status.reblogs_count,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn connector() -> MastodonConnector {
        MastodonConnector::new(SourceHttp::new(5, "finpulse-test").expect("client"))
    }

    #[test]
    fn plan_takes_first_ten_tags_without_hash() {
        let tags: Vec<String> = (0..12).map(|i| format!("#tag{i}")).collect();
        let vocab = QueryVocabulary::new(vec!["stocks".to_string()], tags);
        let shards = connector().plan(&vocab).expect("plan");
        assert_eq!(shards.len(), 10);
        assert_eq!(shards[0].query, "tag0");
    }

    #[test]
    fn normalize_strips_html_and_maps_counts() {
        let post = connector()
            .normalize(RawItem::Mastodon(json!({
                "id": "111222333",
                "content": "<p>Bond yields &amp; the <a href=\"#\">#economy</a> today</p>",
                "url": "https://mastodon.social/@econ/111222333",
                "account": {"display_name": "", "username": "econ"},
                "created_at": "2025-02-03T04:05:06.000Z",
                "favourites_count": 7,
                "replies_count": 2,
                "reblogs_count": 3
            })))
            .expect("valid status");
        assert_eq!(post.content, "Bond yields & the #economy today");
        assert_eq!(post.title, "Bond yields & the #economy today...");
        assert_eq!(post.classification_text, "Bond yields & the #economy today");
        assert_eq!(post.author, "econ");
        assert_eq!(post.metrics.shares, 3);
        assert_eq!(post.canonical_key(), "mstdn_111222333");
        assert_eq!(post.timestamp.to_rfc3339(), "2025-02-03T04:05:06+00:00");
    }

    #[test]
    fn markup_only_status_is_skipped() {
        let err = connector()
            .normalize(RawItem::Mastodon(json!({
                "id": "1",
                "content": "<p></p>",
                "url": "https://mastodon.social/@x/1"
            })))
            .unwrap_err();
        assert!(err.reason.contains("no text"));
    }
}
