//! Database operations for the `posts` table.

use chrono::{DateTime, Utc};
use finpulse_core::AnalyzedPost;
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub canonical_key: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub platform: String,
    pub source: String,
    pub metrics: Value,
    pub analysis: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored post count for one platform.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlatformCount {
    pub platform: String,
    pub posts: i64,
}

struct EncodedPost<'a> {
    post: &'a AnalyzedPost,
    metrics: Value,
    analysis: Value,
}

fn encode(post: &AnalyzedPost) -> Result<EncodedPost<'_>, DbError> {
    let encode_err = |column, source| DbError::Encode {
        canonical_key: post.canonical_key.clone(),
        column,
        source,
    };
    Ok(EncodedPost {
        post,
        metrics: serde_json::to_value(post.post.metrics).map_err(|e| encode_err("metrics", e))?,
        analysis: serde_json::to_value(&post.analysis).map_err(|e| encode_err("analysis", e))?,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Upsert a batch of analyzed posts keyed by `canonical_key`.
///
/// The whole batch runs in one transaction: either every row is written or
/// none is. A row with an existing key has all its fields replaced except
/// `created_at`. Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError::Encode`] if a post's JSON columns cannot be encoded,
/// or [`DbError::Sqlx`] if any statement fails (the transaction is rolled
/// back).
pub async fn upsert_posts(pool: &PgPool, posts: &[AnalyzedPost]) -> Result<usize, DbError> {
    if posts.is_empty() {
        return Ok(0);
    }
    let encoded = posts.iter().map(encode).collect::<Result<Vec<_>, _>>()?;

    let mut tx = pool.begin().await?;
    let mut written = 0_usize;
    for row in encoded {
        let post = &row.post.post;
        let result = sqlx::query(
            "INSERT INTO posts \
                 (canonical_key, title, content, url, author, published_at, \
                  platform, source, metrics, analysis) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (canonical_key) DO UPDATE SET \
                 title        = EXCLUDED.title, \
                 content      = EXCLUDED.content, \
                 url          = EXCLUDED.url, \
                 author       = EXCLUDED.author, \
                 published_at = EXCLUDED.published_at, \
                 platform     = EXCLUDED.platform, \
                 source       = EXCLUDED.source, \
                 metrics      = EXCLUDED.metrics, \
                 analysis     = EXCLUDED.analysis, \
                 updated_at   = NOW()",
        )
        .bind(&row.post.canonical_key)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.url)
        .bind(&post.author)
        .bind(post.timestamp)
        .bind(post.platform.as_str())
        .bind(&post.source)
        .bind(&row.metrics)
        .bind(&row.analysis)
        .execute(&mut *tx)
        .await?;
        written += usize::try_from(result.rows_affected()).unwrap_or(0);
    }
    tx.commit().await?;

    Ok(written)
}

/// Total number of stored posts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Stored post counts grouped by platform, ordered by platform name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_by_platform(pool: &PgPool) -> Result<Vec<PlatformCount>, DbError> {
    let rows = sqlx::query_as::<_, PlatformCount>(
        "SELECT platform, COUNT(*) AS posts \
         FROM posts \
         GROUP BY platform \
         ORDER BY platform",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetch one post by canonical key, or `None` if it was never stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_post(pool: &PgPool, canonical_key: &str) -> Result<Option<PostRow>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(
        "SELECT canonical_key, title, content, url, author, published_at, platform, \
                source, metrics, analysis, created_at, updated_at \
         FROM posts \
         WHERE canonical_key = $1",
    )
    .bind(canonical_key)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
