//! Connector fetch and normalize tests against wiremock servers.

use finpulse_core::Platform;
use finpulse_ingest::sources::{
    ArchiveKind, HackerNewsConnector, LemmyConnector, MarketWatchConnector, MastodonConnector,
    MediumConnector, NewsArchiveConnector, RedditConnector, YouTubeConnector,
};
use finpulse_ingest::{FetchError, QueryShard, RawItem, SourceConnector, SourceCursor, SourceHttp};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> SourceHttp {
    SourceHttp::new(5, "finpulse-test").expect("client construction should not fail")
}

fn reddit_child(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": "t3",
        "data": {
            "id": id,
            "title": title,
            "selftext": "",
            "permalink": format!("/r/stocks/comments/{id}/"),
            "author": "trader",
            "created_utc": 1_710_000_000.0,
            "score": 10,
            "num_comments": 2
        }
    })
}

#[tokio::test]
async fn reddit_pages_follow_after_token() {
    let server = MockServer::start().await;
    let query = "\"inflation\" OR \"crypto\"";

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", query))
        .and(query_param("sort", "new"))
        .and(query_param("limit", "25"))
        .and(query_param("after", "t3_second"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "children": [], "after": null }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("q", query))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "children": [
                    reddit_child("first", "Inflation surprises to the upside"),
                    reddit_child("second", "Crypto market rallies"),
                    { "kind": "t3" }
                ],
                "after": "t3_second"
            }
        })))
        .mount(&server)
        .await;

    let connector = RedditConnector::new(http()).with_base_url(server.uri());
    let shard = QueryShard::new(query);

    let mut cursor = SourceCursor::default();
    let page = connector
        .fetch_page(&shard, &cursor)
        .await
        .expect("first page");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.parse_failures.len(), 1);
    assert_eq!(page.next_cursor.as_deref(), Some("t3_second"));
    cursor.record_page(page.items.len(), page.next_cursor.clone());

    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid reddit post");
    assert_eq!(post.canonical_key(), "rd_first");
    assert_eq!(post.platform, Platform::Reddit);

    let second = connector
        .fetch_page(&shard, &cursor)
        .await
        .expect("second page");
    assert!(second.items.is_empty());
    cursor.record_page(second.items.len(), second.next_cursor);
    assert!(cursor.done);
}

#[tokio::test]
async fn reddit_block_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let connector = RedditConnector::new(http()).with_base_url(server.uri());
    let err = connector
        .fetch_page(&QueryShard::new("\"stocks\""), &SourceCursor::default())
        .await
        .expect_err("429 should fail the page");
    assert!(matches!(err, FetchError::Status { status: 429, .. }));
}

#[tokio::test]
async fn malformed_json_is_a_body_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let connector = HackerNewsConnector::new(http()).with_base_url(server.uri());
    let err = connector
        .fetch_page(&QueryShard::new("finance"), &SourceCursor::default())
        .await
        .expect_err("html body should not parse");
    assert!(matches!(err, FetchError::Body { .. }));
}

fn rss_feed(count: usize) -> String {
    let items: String = (0..count)
        .map(|i| {
            format!(
                "<item><title>Stocks climb on rate hopes {i} - Wire</title>\
                 <link>https://news.example.com/{i}</link>\
                 <description>&lt;p&gt;Markets update {i}&lt;/p&gt;</description></item>"
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title>{items}</channel></rss>"#)
}

#[tokio::test]
async fn google_news_archive_caps_items_and_dates_by_window() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "inflation after:2019-01-01 before:2019-12-31"))
        .and(query_param("hl", "en-IN"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(15)))
        .mount(&server)
        .await;

    let connector = NewsArchiveConnector::new(http(), ArchiveKind::GoogleNews, 2019)
        .with_current_year(2019)
        .with_base_url(server.uri());
    let vocab = finpulse_core::QueryVocabulary::new(vec!["inflation".to_string()], Vec::new());
    let shards = connector.plan(&vocab).expect("plan");
    assert_eq!(shards.len(), 1);

    let page = connector
        .fetch_page(&shards[0], &SourceCursor::default())
        .await
        .expect("feed page");
    assert_eq!(page.items.len(), 10);
    assert!(page.next_cursor.is_none());

    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid news item");
    assert_eq!(post.url, "https://news.example.com/0");
    assert_eq!(post.timestamp.to_rfc3339(), "2019-01-01T00:00:00+00:00");
    assert_eq!(post.platform, Platform::GoogleNews);
}

#[tokio::test]
async fn facebook_archive_uses_site_query_and_description() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param(
            "q",
            "site:facebook.com investing after:2020-01-01 before:2020-12-31",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(2)))
        .mount(&server)
        .await;

    let connector = NewsArchiveConnector::new(http(), ArchiveKind::Facebook, 2020)
        .with_current_year(2020)
        .with_base_url(server.uri());
    let vocab = finpulse_core::QueryVocabulary::new(vec!["investing".to_string()], Vec::new());
    let shard = connector.plan(&vocab).expect("plan").remove(0);
    let page = connector
        .fetch_page(&shard, &SourceCursor::default())
        .await
        .expect("feed page");
    assert_eq!(page.items.len(), 2);

    let post = connector
        .normalize(page.items[1].clone())
        .expect("valid proxy item");
    assert_eq!(post.title, "[Facebook 2020] Stocks climb on rate hopes 1");
    assert_eq!(post.content, "Markets update 1");
    assert!(post.canonical_key().starts_with("proxy_"));
}

#[tokio::test]
async fn broken_feed_is_a_body_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed/tag/stock-market"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<rss><channel><item><title>x</link>"),
        )
        .mount(&server)
        .await;

    let connector = MediumConnector::new(http()).with_base_url(server.uri());
    let err = connector
        .fetch_page(&QueryShard::new("stock-market"), &SourceCursor::default())
        .await
        .expect_err("mismatched tags should fail");
    assert!(matches!(err, FetchError::Body { .. }));
}

#[tokio::test]
async fn medium_feed_items_become_posts() {
    let server = MockServer::start().await;
    let feed = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/"><channel>
<item><title><![CDATA[Building a dividend portfolio]]></title>
<link>https://medium.com/@a/dividends-1</link>
<dc:creator><![CDATA[Ana Lyst]]></dc:creator>
<pubDate>Tue, 04 Mar 2025 10:00:00 GMT</pubDate></item>
</channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/feed/tag/stock-market"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(&server)
        .await;

    let connector = MediumConnector::new(http()).with_base_url(server.uri());
    let vocab =
        finpulse_core::QueryVocabulary::new(vec!["stock market".to_string()], Vec::new());
    let shard = connector.plan(&vocab).expect("plan").remove(0);
    let page = connector
        .fetch_page(&shard, &SourceCursor::default())
        .await
        .expect("feed page");
    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid medium item");
    assert_eq!(post.author, "Ana Lyst");
    assert_eq!(post.title, "Building a dividend portfolio");
}

#[tokio::test]
async fn mastodon_reads_tag_timeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/timelines/tag/stocks"))
        .and(query_param("limit", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "1001",
                "content": "<p>Stocks are <b>up</b> today</p>",
                "url": "https://mastodon.social/@a/1001",
                "account": {"display_name": "Ann", "username": "ann"},
                "favourites_count": 4
            },
            { "content": "no id" }
        ])))
        .mount(&server)
        .await;

    let connector = MastodonConnector::new(http()).with_base_url(server.uri());
    let page = connector
        .fetch_page(&QueryShard::new("stocks"), &SourceCursor::default())
        .await
        .expect("timeline page");
    assert_eq!(page.items.len(), 2);

    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid status");
    assert_eq!(post.content, "Stocks are up today");
    assert_eq!(post.author, "Ann");
    assert!(connector.normalize(page.items[1].clone()).is_err());
}

#[tokio::test]
async fn hacker_news_sends_story_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .and(query_param("query", "inflation OR crypto"))
        .and(query_param("tags", "story"))
        .and(query_param("hitsPerPage", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "hits": [
                {"objectID": "42", "title": "Why inflation is sticky", "points": 99, "num_comments": 12}
            ]
        })))
        .mount(&server)
        .await;

    let connector = HackerNewsConnector::new(http()).with_base_url(server.uri());
    let page = connector
        .fetch_page(&QueryShard::new("inflation OR crypto"), &SourceCursor::default())
        .await
        .expect("search page");
    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid hit");
    assert_eq!(post.canonical_key(), "hn_42");
    assert_eq!(post.content, "Why inflation is sticky");
    assert_eq!(post.classification_text, "Why inflation is sticky");
    assert_eq!(post.metrics.comments, 12);
}

#[tokio::test]
async fn lemmy_lists_new_community_posts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/post/list"))
        .and(query_param("community_name", "investing"))
        .and(query_param("sort", "New"))
        .and(query_param("limit", "40"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "posts": [{
                "post": {"id": 7, "name": "Index funds vs bonds", "ap_id": "https://lemmy.world/post/7"},
                "counts": {"score": 3, "comments": 1}
            }]
        })))
        .mount(&server)
        .await;

    let connector = LemmyConnector::new(http()).with_base_url(server.uri());
    let page = connector
        .fetch_page(&QueryShard::new("investing"), &SourceCursor::default())
        .await
        .expect("post list");
    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid post");
    assert_eq!(post.canonical_key(), "lemmy_7");
    assert_eq!(post.content, "Index funds vs bonds");
}

#[tokio::test]
async fn youtube_results_yield_video_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/results"))
        .and(query_param("search_query", "stock market"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"var ytInitialData = {"videoId":"AAAAAAAAAAA","x":{"videoId":"BBBBBBBBBBB"},"videoId":"AAAAAAAAAAA"};"#,
        ))
        .mount(&server)
        .await;

    let connector = YouTubeConnector::new(http()).with_base_url(server.uri());
    let page = connector
        .fetch_page(&QueryShard::new("stock market"), &SourceCursor::default())
        .await
        .expect("results page");
    assert_eq!(
        page.items,
        vec![
            RawItem::YouTube {
                video_id: "AAAAAAAAAAA".to_string(),
                query: "stock market".to_string()
            },
            RawItem::YouTube {
                video_id: "BBBBBBBBBBB".to_string(),
                query: "stock market".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn marketwatch_scrapes_link_anchors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest-news"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<ul><li><a class="link" href="/story/stocks-rally-1">Stocks rally into the close</a></li></ul>"#,
        ))
        .mount(&server)
        .await;

    let connector = MarketWatchConnector::new(http()).with_base_url(server.uri());
    let vocab = finpulse_core::QueryVocabulary::fallback();
    let shard = connector.plan(&vocab).expect("plan").remove(0);
    let page = connector
        .fetch_page(&shard, &SourceCursor::default())
        .await
        .expect("listing page");
    let post = connector
        .normalize(page.items[0].clone())
        .expect("valid link");
    assert_eq!(post.url, "https://www.marketwatch.com/story/stocks-rally-1");
    assert_eq!(post.platform, Platform::Web);
}
