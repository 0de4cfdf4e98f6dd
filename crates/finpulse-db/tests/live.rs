//! Live integration tests for finpulse-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/finpulse-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{TimeZone, Utc};
use finpulse_core::{
    AnalysisResult, AnalyzedPost, CandidatePost, Metrics, NaturalId, Platform, SentimentClass,
};
use finpulse_db::{count_by_platform, count_posts, get_post, ping, upsert_posts, PlatformCount};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn analyzed(platform: Platform, id: &str, likes: i64) -> AnalyzedPost {
    AnalyzedPost::new(
        CandidatePost {
            natural_id: NaturalId::Native(id.to_string()),
            title: format!("Markets update {id}"),
            content: "Stocks rallied into the close.".to_string(),
            url: format!("https://example.com/{id}"),
            author: "analyst".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 14, 15, 30, 0).unwrap(),
            platform,
            source: platform.as_str().to_lowercase(),
            metrics: Metrics {
                likes,
                comments: 2,
                shares: 0,
            },
            classification_text: format!("Markets update {id}"),
        },
        AnalysisResult::accepted("Stocks rallied into the close.", SentimentClass::Positive, 0.8),
    )
}

// ---------------------------------------------------------------------------
// Connectivity
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn ping_succeeds_on_live_pool(pool: sqlx::PgPool) {
    ping(&pool).await.expect("ping failed");
}

// ---------------------------------------------------------------------------
// Upserts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_inserts_new_posts(pool: sqlx::PgPool) {
    let written = upsert_posts(
        &pool,
        &[
            analyzed(Platform::Reddit, "a1", 5),
            analyzed(Platform::HackerNews, "77", 9),
        ],
    )
    .await
    .expect("upsert_posts failed");

    assert_eq!(written, 2);
    assert_eq!(count_posts(&pool).await.expect("count failed"), 2);

    let row = get_post(&pool, "rd_a1")
        .await
        .expect("get_post failed")
        .expect("row should exist");
    assert_eq!(row.platform, "Reddit");
    assert_eq!(row.metrics["likes"], 5);
    assert_eq!(row.analysis["sentimentClass"], "Positive");
}

#[sqlx::test(migrations = "../../migrations")]
async fn repeated_upsert_is_idempotent(pool: sqlx::PgPool) {
    let batch = [analyzed(Platform::Lemmy, "12", 1)];
    upsert_posts(&pool, &batch).await.expect("first upsert failed");
    upsert_posts(&pool, &batch).await.expect("second upsert failed");

    assert_eq!(count_posts(&pool).await.expect("count failed"), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn later_upsert_replaces_fields_and_keeps_created_at(pool: sqlx::PgPool) {
    upsert_posts(&pool, &[analyzed(Platform::Reddit, "x9", 1)])
        .await
        .expect("first upsert failed");
    let before = get_post(&pool, "rd_x9")
        .await
        .expect("get_post failed")
        .expect("row should exist");

    let mut updated = analyzed(Platform::Reddit, "x9", 250);
    updated.post.title = "Markets update x9 (edited)".to_string();
    upsert_posts(&pool, &[updated])
        .await
        .expect("second upsert failed");

    let after = get_post(&pool, "rd_x9")
        .await
        .expect("get_post failed")
        .expect("row should exist");
    assert_eq!(after.metrics["likes"], 250);
    assert_eq!(after.title, "Markets update x9 (edited)");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_batch_leaves_existing_rows_untouched(pool: sqlx::PgPool) {
    upsert_posts(&pool, &[analyzed(Platform::Medium, "m1", 3)])
        .await
        .expect("seed upsert failed");

    let mut changed = analyzed(Platform::Medium, "m1", 99);
    changed.post.title = "should not land".to_string();
    let mut blank_url = analyzed(Platform::Medium, "m2", 1);
    blank_url.post.url = "   ".to_string();

    let result = upsert_posts(&pool, &[changed, blank_url]).await;
    assert!(result.is_err(), "blank url must violate the table constraint");

    let row = get_post(&pool, "med_m1")
        .await
        .expect("get_post failed")
        .expect("row should exist");
    assert_eq!(row.metrics["likes"], 3);
    assert_eq!(count_posts(&pool).await.expect("count failed"), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_batch_writes_nothing(pool: sqlx::PgPool) {
    assert_eq!(upsert_posts(&pool, &[]).await.expect("upsert failed"), 0);
    assert_eq!(count_posts(&pool).await.expect("count failed"), 0);
}

// ---------------------------------------------------------------------------
// Status queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn counts_group_by_platform(pool: sqlx::PgPool) {
    upsert_posts(
        &pool,
        &[
            analyzed(Platform::Reddit, "r1", 1),
            analyzed(Platform::Reddit, "r2", 1),
            analyzed(Platform::Mastodon, "s1", 1),
        ],
    )
    .await
    .expect("upsert_posts failed");

    let counts = count_by_platform(&pool).await.expect("count_by_platform failed");
    assert_eq!(
        counts,
        vec![
            PlatformCount {
                platform: "Mastodon".to_string(),
                posts: 1,
            },
            PlatformCount {
                platform: "Reddit".to_string(),
                posts: 2,
            },
        ]
    );
}
