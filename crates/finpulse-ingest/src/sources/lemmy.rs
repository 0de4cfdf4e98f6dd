//! Lemmy community post listings.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use serde::Deserialize;

use super::http::{host_of, SourceHttp};
use super::{from_json, unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "lemmy";
const DEFAULT_BASE_URL: &str = "https://lemmy.world";
const COMMUNITIES: &[&str] = &["finance", "investing", "bitcoin", "economics"];
const PAGE_LIMIT: &str = "40";

#[derive(Debug, Deserialize)]
struct PostList {
    #[serde(default)]
    posts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct PostView {
    post: LemmyPost,
    #[serde(default)]
    counts: Counts,
}

#[derive(Debug, Deserialize)]
struct LemmyPost {
    id: i64,
    #[serde(default)]
    name: String,
    body: Option<String>,
    ap_id: Option<String>,
    url: Option<String>,
    creator_id: Option<i64>,
    published: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Counts {
    #[serde(default)]
    score: i64,
    #[serde(default)]
    comments: i64,
}

pub struct LemmyConnector {
    http: SourceHttp,
    base_url: String,
}

impl LemmyConnector {
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

/// Lemmy has published both RFC 3339 and zone-less UTC timestamps.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
}

#[async_trait]
impl SourceConnector for LemmyConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::Lemmy
    }

    fn rate_key(&self) -> String {
        host_of(&self.base_url)
    }

    fn plan(&self, _vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError> {
        Ok(COMMUNITIES.iter().map(|c| QueryShard::new(*c)).collect())
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/api/v3/post/list", self.base_url);
        let params = [
            ("community_name", shard.query.as_str()),
            ("sort", "New"),
            ("limit", PAGE_LIMIT),
        ];
        let list: PostList = self.http.get_json(&url, &params).await?;

        Ok(Page {
            items: list.posts.into_iter().map(RawItem::Lemmy).collect(),
            ..Page::default()
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::Lemmy(value) = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let view: PostView = from_json(NAME, value)?;
        let post = view.post;

        let title = post.name.trim().to_string();
        if title.is_empty() {
            return Err(ItemParseError::new(NAME, format!("post {} has no title", post.id)));
        }
        let url = post
            .ap_id
            .or(post.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ItemParseError::new(NAME, format!("post {} has no url", post.id)))?;
        let body = post.body.as_deref().map(str::trim).unwrap_or_default();
        let classification_text = CandidatePost::headline_with_body(&title, body);
        let content = if body.is_empty() {
            title.clone()
        } else {
            body.to_string()
        };
        let author = post
            .creator_id
            .map_or_else(|| "Lemmy_User".to_string(), |id| format!("Lemmy_User_{id}"));

        Ok(CandidatePost {
            natural_id: NaturalId::Native(post.id.to_string()),
            title,
            content,
            url,
            author,
            timestamp: post
                .published
                .as_deref()
                .and_then(parse_published)
                .unwrap_or_else(Utc::now),
            platform: Platform::Lemmy,
            source: "lemmy".to_string(),
            metrics: Metrics {
                likes: view.counts.score,
                comments: view.counts.comments,
                shares: 0,
            },
            classification_text,
        })
    }
}
