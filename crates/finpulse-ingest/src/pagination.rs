//! Per-shard cursor tracking and the page cap.

use std::sync::Arc;

use crate::pacing::RequestPacer;

/// Position within one (connector, shard) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCursor {
    /// Continuation token for the next page, if the source issued one.
    pub token: Option<String>,
    pub pages_issued: u32,
    pub done: bool,
}

impl SourceCursor {
    /// Record a fetched page. An empty page or a missing continuation token
    /// terminates the cursor.
    pub fn record_page(&mut self, item_count: usize, next: Option<String>) {
        self.pages_issued = self.pages_issued.saturating_add(1);
        if item_count == 0 || next.is_none() {
            self.done = true;
        }
        self.token = next;
    }
}

/// Decides whether a shard may issue another page and paces every request.
#[derive(Debug, Clone)]
pub struct PaginationController {
    max_pages: u32,
    pacer: Arc<RequestPacer>,
}

impl PaginationController {
    #[must_use]
    pub fn new(max_pages: u32, pacer: Arc<RequestPacer>) -> Self {
        Self { max_pages, pacer }
    }

    /// `true` while the cursor is live and under the page cap.
    #[must_use]
    pub fn should_continue(&self, cursor: &SourceCursor) -> bool {
        !cursor.done && cursor.pages_issued < self.max_pages
    }

    /// Reserve a request slot for `host` on the shared pacer.
    pub async fn pace(&self, host: &str) {
        self.pacer.wait(host).await;
    }
}
