//! Ingestion pipeline for finpulse.
//!
//! Pulls finance-related posts from public sources, filters them through a
//! relevance gatekeeper, classifies sentiment and upserts the accepted posts
//! into a keyed store.

pub mod classifier;
pub mod error;
pub mod pacing;
pub mod pagination;
pub mod pipeline;
pub mod sources;
pub mod store;

pub use classifier::{build_gatekeeper, ClassifierCapability, Gatekeeper};
pub use error::{ClassifierError, ConnectorError, FetchError, ItemParseError, StoreError};
pub use pacing::RequestPacer;
pub use pagination::{PaginationController, SourceCursor};
pub use pipeline::{
    ConnectorReport, ConnectorStatus, IngestSettings, Orchestrator, RunSummary, RunTotals,
};
pub use sources::{
    default_connectors, Page, QueryShard, RawItem, SourceConnector, SourceHttp, CONNECTOR_ORDER,
};
pub use store::{BatchOutcome, MemoryPostStore, PersistenceGateway, PostStore};
