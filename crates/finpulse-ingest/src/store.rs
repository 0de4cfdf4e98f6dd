//! Deduplicating persistence gateway in front of a [`PostStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use finpulse_core::AnalyzedPost;
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Keyed post storage. One record per canonical key; an upsert fully
/// replaces the stored fields.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Upsert `posts` as one batch, returning how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the batch could not be written. A failed
    /// batch leaves previously stored records untouched.
    async fn upsert_posts(&self, posts: &[AnalyzedPost]) -> Result<usize, StoreError>;

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// In-process store for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: Mutex<HashMap<String, AnalyzedPost>>,
}

impl MemoryPostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, canonical_key: &str) -> Option<AnalyzedPost> {
        self.posts.lock().await.get(canonical_key).cloned()
    }

    /// All stored posts, ordered by canonical key.
    pub async fn snapshot(&self) -> Vec<AnalyzedPost> {
        let mut all: Vec<AnalyzedPost> = self.posts.lock().await.values().cloned().collect();
        all.sort_by(|a, b| a.canonical_key.cmp(&b.canonical_key));
        all
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn upsert_posts(&self, posts: &[AnalyzedPost]) -> Result<usize, StoreError> {
        let mut stored = self.posts.lock().await;
        for post in posts {
            stored.insert(post.canonical_key.clone(), post.clone());
        }
        Ok(posts.len())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.posts.lock().await.len() as u64)
    }
}

/// Result of one [`PersistenceGateway::upsert_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub persisted: usize,
    pub quarantined: usize,
    /// `true` when the store rejected the batch.
    pub failed: bool,
}

/// Collapse duplicate keys to their last occurrence, keeping first-seen order.
#[must_use]
pub fn dedup_last_wins(posts: Vec<AnalyzedPost>) -> Vec<AnalyzedPost> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<AnalyzedPost> = Vec::with_capacity(posts.len());
    for post in posts {
        match index.get(&post.canonical_key) {
            Some(&i) => unique[i] = post,
            None => {
                index.insert(post.canonical_key.clone(), unique.len());
                unique.push(post);
            }
        }
    }
    unique
}

/// Validates, deduplicates and writes batches of accepted posts.
#[derive(Clone)]
pub struct PersistenceGateway {
    store: Arc<dyn PostStore>,
}

impl PersistenceGateway {
    #[must_use]
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Upsert `items`. Records missing required fields are quarantined; a
    /// store failure counts as zero persisted.
    pub async fn upsert_batch(&self, items: Vec<AnalyzedPost>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        let valid: Vec<AnalyzedPost> = items
            .into_iter()
            .filter(|post| {
                let missing = post.missing_fields();
                if missing.is_empty() {
                    true
                } else {
                    tracing::warn!(
                        canonical_key = %post.canonical_key,
                        source = %post.post.source,
                        missing = ?missing,
                        "quarantined record with missing fields"
                    );
                    outcome.quarantined += 1;
                    false
                }
            })
            .collect();

        let batch = dedup_last_wins(valid);
        if batch.is_empty() {
            return outcome;
        }

        match self.store.upsert_posts(&batch).await {
            Ok(written) => outcome.persisted = written,
            Err(e) => {
                tracing::error!(batch_size = batch.len(), error = %e, "batch upsert failed");
                outcome.failed = true;
            }
        }
        outcome
    }
}
