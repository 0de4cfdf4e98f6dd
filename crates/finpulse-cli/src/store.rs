//! Postgres-backed [`PostStore`] for ingest runs.

use async_trait::async_trait;
use finpulse_core::AnalyzedPost;
use finpulse_ingest::{PostStore, StoreError};

pub(crate) struct PgPostStore {
    pool: sqlx::PgPool,
}

impl PgPostStore {
    pub(crate) fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn upsert_posts(&self, posts: &[AnalyzedPost]) -> Result<usize, StoreError> {
        finpulse_db::upsert_posts(&self.pool, posts)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count = finpulse_db::count_posts(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
