//! Source connectors: one per upstream, all behind [`SourceConnector`].

mod hacker_news;
mod http;
mod lemmy;
mod marketwatch;
mod mastodon;
mod medium;
mod news_archive;
mod reddit;
mod rss;
mod text;
mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use finpulse_core::{CandidatePost, Platform, QueryVocabulary};

use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

pub use hacker_news::HackerNewsConnector;
pub use http::SourceHttp;
pub use lemmy::LemmyConnector;
pub use marketwatch::MarketWatchConnector;
pub use mastodon::MastodonConnector;
pub use medium::MediumConnector;
pub use news_archive::{ArchiveKind, NewsArchiveConnector};
pub use reddit::RedditConnector;
pub use rss::RssItem;
pub use youtube::YouTubeConnector;

/// Connector names in the order a run visits them.
pub const CONNECTOR_ORDER: &[&str] = &[
    "reddit",
    "google_news",
    "youtube",
    "mastodon",
    "hacker_news",
    "medium",
    "lemmy",
    "facebook_archive",
    "instagram_archive",
    "marketwatch",
];

/// One query unit of a connector: a keyword chunk, a year window or a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShard {
    /// Short human label for logs and reports.
    pub label: String,
    pub query: String,
    /// Archive year, for time-windowed connectors.
    pub window: Option<i32>,
}

impl QueryShard {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            label: query.clone(),
            query,
            window: None,
        }
    }

    #[must_use]
    pub fn in_year(query: impl Into<String>, year: i32) -> Self {
        let query = query.into();
        Self {
            label: format!("{query} ({year})"),
            query,
            window: Some(year),
        }
    }
}

/// Source item as it came off the wire, tagged by format.
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    /// `data` object of a Reddit listing child.
    Reddit(serde_json::Value),
    /// Google News RSS item collected for an archive year.
    NewsArchive { item: RssItem, year: i32 },
    /// Video id scraped from a results page, with the query that found it.
    YouTube { video_id: String, query: String },
    /// Mastodon status object.
    Mastodon(serde_json::Value),
    /// Algolia search hit.
    HackerNews(serde_json::Value),
    Medium(RssItem),
    /// Lemmy `post_view` object.
    Lemmy(serde_json::Value),
    /// Headline anchor scraped from an HTML listing.
    WebLink { title: String, href: String },
}

impl RawItem {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            RawItem::Reddit(_) => "reddit",
            RawItem::NewsArchive { .. } => "news_archive",
            RawItem::YouTube { .. } => "youtube",
            RawItem::Mastodon(_) => "mastodon",
            RawItem::HackerNews(_) => "hacker_news",
            RawItem::Medium(_) => "medium",
            RawItem::Lemmy(_) => "lemmy",
            RawItem::WebLink { .. } => "web_link",
        }
    }
}

/// One fetched page. Items that could not even be lifted into a [`RawItem`]
/// are reported in `parse_failures`.
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<RawItem>,
    pub parse_failures: Vec<ItemParseError>,
    /// Continuation token; `None` ends the shard.
    pub next_cursor: Option<String>,
}

#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Stable identifier used in reports and `--only` filters.
    fn name(&self) -> &'static str;

    fn platform(&self) -> Platform;

    /// Upstream host whose request budget this connector draws from.
    fn rate_key(&self) -> String;

    /// Turn the vocabulary into the shards this run will query.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError`] when the vocabulary leaves nothing to query.
    fn plan(&self, vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError>;

    /// Fetch the page at `cursor` for `shard`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport failure, a non-success status or
    /// a body that cannot be read as a page. The shard ends there.
    async fn fetch_page(
        &self,
        shard: &QueryShard,
        cursor: &SourceCursor,
    ) -> Result<Page, FetchError>;

    /// Map one raw item to the canonical candidate shape.
    ///
    /// # Errors
    ///
    /// Returns [`ItemParseError`] when a required field is missing or malformed.
    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError>;
}

/// Every shipped connector, in [`CONNECTOR_ORDER`].
#[must_use]
pub fn default_connectors(
    http: &SourceHttp,
    archive_floor_year: i32,
) -> Vec<Arc<dyn SourceConnector>> {
    vec![
        Arc::new(RedditConnector::new(http.clone())),
        Arc::new(NewsArchiveConnector::new(
            http.clone(),
            ArchiveKind::GoogleNews,
            archive_floor_year,
        )),
        Arc::new(YouTubeConnector::new(http.clone())),
        Arc::new(MastodonConnector::new(http.clone())),
        Arc::new(HackerNewsConnector::new(http.clone())),
        Arc::new(MediumConnector::new(http.clone())),
        Arc::new(LemmyConnector::new(http.clone())),
        Arc::new(NewsArchiveConnector::new(
            http.clone(),
            ArchiveKind::Facebook,
            archive_floor_year,
        )),
        Arc::new(NewsArchiveConnector::new(
            http.clone(),
            ArchiveKind::Instagram,
            archive_floor_year,
        )),
        Arc::new(MarketWatchConnector::new(http.clone())),
    ]
}

/// Parse error for an item of the wrong variant handed to `normalize`.
pub(crate) fn unexpected_item(connector: &'static str, item: &RawItem) -> ItemParseError {
    ItemParseError::new(
        connector,
        format!("unexpected {} item for this connector", item.kind()),
    )
}

/// Deserialize one JSON item into a connector's typed view of it.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    connector: &'static str,
    value: serde_json::Value,
) -> Result<T, ItemParseError> {
    serde_json::from_value(value).map_err(|e| ItemParseError::new(connector, e.to_string()))
}
