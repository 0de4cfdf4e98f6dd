//! MarketWatch latest-news page, scraped for headline anchors.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};
use regex::Regex;

use super::http::{host_of, SourceHttp};
use super::text::html_to_text;
use super::{unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const NAME: &str = "marketwatch";
const DEFAULT_BASE_URL: &str = "https://www.marketwatch.com";
const SITE_ORIGIN: &str = "https://www.marketwatch.com";
const MAX_HEADLINES: usize = 10;

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("valid anchor regex"));
static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*"([^"]*)""#).expect("valid class attribute regex")
});
static HREF_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*"([^"]*)""#).expect("valid href attribute regex")
});

pub struct MarketWatchConnector {
    http: SourceHttp,
    base_url: String,
}

impl MarketWatchConnector {
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

/// First `limit` anchors whose class list contains `link`, as
/// `(text, href)` pairs. Anchors without text or href are reported as
/// failures.
fn extract_headline_links(html: &str, limit: usize) -> (Vec<RawItem>, Vec<ItemParseError>) {
    let mut items = Vec::new();
    let mut failures = Vec::new();

    for caps in ANCHOR_RE.captures_iter(html) {
        if items.len() + failures.len() >= limit {
            break;
        }
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let is_link_class = CLASS_ATTR_RE
            .captures(attrs)
            .and_then(|c| c.get(1))
            .is_some_and(|classes| classes.as_str().split_whitespace().any(|c| c == "link"));
        if !is_link_class {
            continue;
        }

        let title = html_to_text(caps.get(2).map_or("", |m| m.as_str()));
        let href = HREF_ATTR_RE
            .captures(attrs)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|h| !h.is_empty());

        match href {
            Some(href) if !title.is_empty() => items.push(RawItem::WebLink { title, href }),
            _ => failures.push(ItemParseError::new(NAME, "headline anchor without text or href")),
        }
    }

    (items, failures)
}

#[async_trait]
impl SourceConnector for MarketWatchConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn platform(&self) -> Platform {
        Platform::Web
    }

    fn rate_key(&self) -> String {
        host_of(&self.base_url)
    }

    fn plan(&self, _vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError> {
        Ok(vec![QueryShard::new("latest-news")])
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/{}", self.base_url, shard.query);
        let html = self.http.get_text(&url, &[]).await?;
        let (items, parse_failures) = extract_headline_links(&html, MAX_HEADLINES);

        Ok(Page {
            items,
            parse_failures,
            next_cursor: None,
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let RawItem::WebLink { title, href } = item else {
            return Err(unexpected_item(NAME, &item));
        };
        let url = if href.starts_with("http") {
            href
        } else {
            format!("{SITE_ORIGIN}/{}", href.trim_start_matches('/'))
        };

        Ok(CandidatePost {
            natural_id: NaturalId::Url(url.clone()),
            content: title.clone(),
            classification_text: title.clone(),
            title,
            url,
            author: "MarketWatch".to_string(),
            timestamp: Utc::now(),
            platform: Platform::Web,
            source: "marketwatch".to_string(),
            metrics: Metrics::default(),
        })
    }
}
