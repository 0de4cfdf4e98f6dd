//! Medium tag feeds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};

use super::http::{encode_path_segment, host_of, SourceHttp};
use super::rss::parse_rss_items;
use super::text::html_to_text;
use super::{unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "medium";
const DEFAULT_BASE_URL: &str = "https://medium.com";
const MAX_TAGS: usize = 5;
const ITEMS_PER_FEED: usize = 20;

pub struct MediumConnector {
    http: SourceHttp,
    base_url: String,
}

impl MediumConnector {
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

/// Medium tag slugs use dashes for spaces: `stock market` -> `stock-market`.
fn tag_slug(keyword: &str) -> String {
    keyword.split_whitespace().collect::<Vec<_>>().join("-")
}

#[async_trait]
impl SourceConnector for MediumConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::Medium
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
            .take(MAX_TAGS)
            .map(|k| QueryShard::new(tag_slug(k)))
            .collect())
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let tag = encode_path_segment(&shard.query);
        let url = format!("{}/feed/tag/{tag}", self.base_url);
        let body = self.http.get_text(&url, &[]).await?;
        let parsed = parse_rss_items(&body, ITEMS_PER_FEED).map_err(|e| FetchError::Body {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Page {
            items: parsed.items.into_iter().map(RawItem::Medium).collect(),
            parse_failures: parsed
                .rejected
                .into_iter()
                .map(|reason| ItemParseError::new(NAME, reason))
                .collect(),
            next_cursor: None,
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::Medium(item) = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let timestamp = item
            .pub_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .map_or_else(Utc::now, |d| d.with_timezone(&Utc));

        let description = html_to_text(&item.description);
        let content = if description.is_empty() {
            item.title.clone()
        } else {
            description
        };

        Ok(CandidatePost {
            natural_id: NaturalId::Url(item.link.clone()),
            content,
            classification_text: item.title.clone(),
            title: item.title,
            url: item.link,
            author: item.creator.unwrap_or_else(|| "Medium Writer".to_string()),
            timestamp,
            platform: Platform::Medium,
            source: "medium".to_string(),
            metrics: Metrics::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::RssItem;
    use super::*;

    #[test]
    fn tag_slug_dashes_spaces() {
        assert_eq!(tag_slug(" stock  market "), "stock-market");
    }

    #[test]
    fn normalize_reads_creator_and_pub_date() {
        let connector = MediumConnector::new(SourceHttp::new(5, "finpulse-test").expect("client"));
        let post = connector
            .normalize(RawItem::Medium(RssItem {
                title: "Why dividend stocks still matter".to_string(),
                link: "https://medium.com/@writer/dividends-123".to_string(),
                description: String::new(),
                creator: Some("A. Writer".to_string()),
                pub_date: Some("Mon, 03 Mar 2025 09:30:00 GMT".to_string()),
            }))
            .expect("valid item");
        assert_eq!(post.author, "A. Writer");
        assert_eq!(post.content, "Why dividend stocks still matter");
        assert_eq!(post.classification_text, "Why dividend stocks still matter");
        assert_eq!(post.timestamp.to_rfc3339(), "2025-03-03T09:30:00+00:00");
        assert!(post.canonical_key().starts_with("med_"));
    }
}
