//! Year-windowed archives served through the Google News RSS search.
//!
//! The same endpoint backs three connectors: the plain news archive and the
//! Facebook and Instagram archives, which restrict the search with `site:`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use finpulse_core::{CandidatePost, Metrics, NaturalId, Platform, QueryVocabulary};

use super::http::{host_of, SourceHttp};
use super::rss::parse_rss_items;
use super::text::{headline_without_publisher, html_to_text};
use super::{unexpected_item, Page, QueryShard, RawItem, SourceConnector};
use crate::error::{ConnectorError, FetchError, ItemParseError};
use crate::pagination::SourceCursor;

const DEFAULT_BASE_URL: &str = "https://news.google.com";
const KEYWORDS_PER_WINDOW: usize = 5;
const NEWS_ITEMS_PER_QUERY: usize = 10;
const PROXY_ITEMS_PER_QUERY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    GoogleNews,
    Facebook,
    Instagram,
}

impl ArchiveKind {
    fn name(self) -> &'static str {
        match self {
            ArchiveKind::GoogleNews => "google_news",
            ArchiveKind::Facebook => "facebook_archive",
            ArchiveKind::Instagram => "instagram_archive",
        }
    }

    fn platform(self) -> Platform {
        match self {
            ArchiveKind::GoogleNews => Platform::GoogleNews,
            ArchiveKind::Facebook => Platform::Facebook,
            ArchiveKind::Instagram => Platform::Instagram,
        }
    }

    fn site(self) -> Option<&'static str> {
        match self {
            ArchiveKind::GoogleNews => None,
            ArchiveKind::Facebook => Some("facebook.com"),
            ArchiveKind::Instagram => Some("instagram.com"),
        }
    }

    fn items_per_query(self) -> usize {
        match self {
            ArchiveKind::GoogleNews => NEWS_ITEMS_PER_QUERY,
            ArchiveKind::Facebook | ArchiveKind::Instagram => PROXY_ITEMS_PER_QUERY,
        }
    }

    fn search_query(self, keyword: &str, year: i32) -> String {
        let window = format!("after:{year}-01-01 before:{year}-12-31");
        match self.site() {
            Some(site) => format!("site:{site} {keyword} {window}"),
            None => format!("{keyword} {window}"),
        }
    }
}

pub struct NewsArchiveConnector {
    http: SourceHttp,
    kind: ArchiveKind,
    base_url: String,
    floor_year: i32,
    current_year: Option<i32>,
}

impl NewsArchiveConnector {
    #[must_use]
    pub fn new(http: SourceHttp, kind: ArchiveKind, floor_year: i32) -> Self {
        Self {
            http,
            kind,
            base_url: DEFAULT_BASE_URL.to_string(),
            floor_year,
            current_year: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pin the newest archive year instead of reading the clock.
    #[must_use]
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    fn newest_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }

    fn archive_timestamp(&self, year: i32) -> Option<DateTime<Utc>> {
        let (month, day) = match self.kind {
            ArchiveKind::GoogleNews => (1, 1),
            ArchiveKind::Facebook | ArchiveKind::Instagram => (6, 15),
        };
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
    }
}

#[async_trait]
impl SourceConnector for NewsArchiveConnector {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn platform(&self) -> Platform {
        self.kind.platform()
    }

    fn rate_key(&self) -> String {
        host_of(&self.base_url)
    }

    fn plan(&self, vocabulary: &QueryVocabulary) -> Result<Vec<QueryShard>, ConnectorError> {
        let newest = self.newest_year();
        if vocabulary.keywords.is_empty() || self.floor_year > newest {
            return Err(ConnectorError::NoQueries {
                connector: self.kind.name(),
                reason: format!(
                    "{} keywords, years {}..={newest}",
                    vocabulary.keywords.len(),
                    self.floor_year
                ),
            });
        }

        let keywords = &vocabulary.keywords[..vocabulary.keywords.len().min(KEYWORDS_PER_WINDOW)];
        let mut shards = Vec::new();
        for year in (self.floor_year..=newest).rev() {
            for keyword in keywords {
                shards.push(QueryShard {
                    label: format!("{keyword} ({year})"),
                    query: self.kind.search_query(keyword, year),
                    window: Some(year),
                });
            }
        }
        Ok(shards)
    }

    async fn fetch_page(
        &self,
        shard: &QueryShard,
        _cursor: &SourceCursor,
    ) -> Result<Page, FetchError> {
        let url = format!("{}/rss/search", self.base_url);
        let params = [
            ("q", shard.query.as_str()),
            ("hl", "en-IN"),
            ("gl", "IN"),
            ("ceid", "IN:en"),
        ];
        let body = self.http.get_text(&url, &params).await?;
        let parsed =
            parse_rss_items(&body, self.kind.items_per_query()).map_err(|e| FetchError::Body {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let year = shard.window.unwrap_or_else(|| self.newest_year());
        Ok(Page {
            items: parsed
                .items
                .into_iter()
                .map(|item| RawItem::NewsArchive { item, year })
                .collect(),
            parse_failures: parsed
                .rejected
                .into_iter()
                .map(|reason| ItemParseError::new(self.kind.name(), reason))
                .collect(),
            next_cursor: None,
        })
    }

    fn normalize(&self, item: RawItem) -> Result<CandidatePost, ItemParseError> {
        let name = self.kind.name();
        let RawItem::NewsArchive { item, year } = item else {
            return Err(unexpected_item(name, &item));
        };
        let timestamp = self
            .archive_timestamp(year)
            .ok_or_else(|| ItemParseError::new(name, format!("invalid archive year {year}")))?;

        let (title, content, classification_text, author, source) = match self.kind {
            ArchiveKind::GoogleNews => (
                item.title.clone(),
                item.title.clone(),
                item.title,
                "Google News Archive".to_string(),
                "news".to_string(),
            ),
            ArchiveKind::Facebook | ArchiveKind::Instagram => {
                let platform = self.kind.platform();
                let headline = headline_without_publisher(&item.title);
                let description = html_to_text(&item.description);
                let classification_text = CandidatePost::headline_with_body(headline, &description);
                let content = if description.is_empty() {
                    headline.to_string()
                } else {
                    description
                };
                (
                    format!("[{platform} {year}] {headline}"),
                    content,
                    classification_text,
                    "Public User".to_string(),
                    platform.as_str().to_lowercase(),
                )
            }
        };

        Ok(CandidatePost {
            natural_id: NaturalId::Url(item.link.clone()),
            title,
            content,
            url: item.link,
            author,
            timestamp,
            platform: self.kind.platform(),
            source,
            metrics: Metrics::default(),
            classification_text,
        })
    }
}
