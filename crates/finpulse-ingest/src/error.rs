use thiserror::Error;

/// A page or window could not be fetched. Terminates the current shard only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed body from {url}: {reason}")]
    Body { url: String, reason: String },
}

/// One source item could not be turned into a candidate post.
#[derive(Debug, Clone, Error)]
#[error("{connector}: skipped item: {reason}")]
pub struct ItemParseError {
    pub connector: &'static str,
    pub reason: String,
}

impl ItemParseError {
    #[must_use]
    pub fn new(connector: &'static str, reason: impl Into<String>) -> Self {
        Self {
            connector,
            reason: reason.into(),
        }
    }
}

/// A connector could not run at all. It contributes zero items to the run.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("{connector}: no queries to run ({reason})")]
    NoQueries {
        connector: &'static str,
        reason: String,
    },

    #[error("{connector}: task aborted: {reason}")]
    Aborted {
        connector: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected classifier response: {0}")]
    Response(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}
