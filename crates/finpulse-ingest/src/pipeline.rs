//! Run orchestration: connectors, gatekeeper and persistence wired together.
//!
//! Each connector runs as its own task and owns its cursors. A connector that
//! cannot plan, or whose task dies, is reported as failed with zero
//! contribution while the others carry on. Reports come back in connector
//! order regardless of how many run at once.

use std::sync::Arc;
use std::time::Duration;

use finpulse_core::{AnalyzedPost, AppConfig, QueryVocabulary};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use crate::classifier::Gatekeeper;
use crate::error::ConnectorError;
use crate::pagination::{PaginationController, SourceCursor};
use crate::sources::{RawItem, SourceConnector};
use crate::store::{dedup_last_wins, PersistenceGateway};

/// Run-level knobs for the orchestrator.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Fetch and classify as usual but skip persistence.
    pub dry_run: bool,
    /// Connector tasks allowed to run at once; `1` is fully sequential.
    pub max_concurrent_connectors: usize,
    /// Wall-clock budget per connector. No new page is issued after it expires.
    pub connector_deadline: Option<Duration>,
}

impl IngestSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            max_concurrent_connectors: config.max_concurrent_connectors,
            connector_deadline: config.connector_deadline,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_concurrent_connectors: 1,
            connector_deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorStatus {
    Completed,
    DeadlineReached,
    Failed(String),
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorStatus::Completed => f.write_str("completed"),
            ConnectorStatus::DeadlineReached => f.write_str("deadline"),
            ConnectorStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-connector counters for one run.
///
/// `fetched` counts every item a page carried, so
/// `fetched == parse_skipped + accepted + rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorReport {
    pub name: String,
    pub status: ConnectorStatus,
    pub shards: usize,
    pub pages: usize,
    pub fetched: usize,
    pub parse_skipped: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub persisted: usize,
    pub quarantined: usize,
    pub fetch_errors: usize,
    pub persist_errors: usize,
}

impl ConnectorReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: ConnectorStatus::Completed,
            shards: 0,
            pages: 0,
            fetched: 0,
            parse_skipped: 0,
            accepted: 0,
            rejected: 0,
            persisted: 0,
            quarantined: 0,
            fetch_errors: 0,
            persist_errors: 0,
        }
    }

    fn failed(name: &str, reason: String) -> Self {
        Self {
            status: ConnectorStatus::Failed(reason),
            ..Self::new(name)
        }
    }
}

/// Sums over every connector report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub fetched: usize,
    pub parse_skipped: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub persisted: usize,
    pub quarantined: usize,
    pub fetch_errors: usize,
    pub persist_errors: usize,
    pub failed_connectors: usize,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// One report per connector, in run order.
    pub reports: Vec<ConnectorReport>,
    pub dry_run: bool,
    /// Accepted posts a dry run would have written, deduplicated by key with
    /// the last occurrence winning. Always empty outside dry runs.
    pub would_persist: Vec<AnalyzedPost>,
}

impl RunSummary {
    #[must_use]
    pub fn totals(&self) -> RunTotals {
        self.reports.iter().fold(RunTotals::default(), |mut t, r| {
            t.fetched += r.fetched;
            t.parse_skipped += r.parse_skipped;
            t.accepted += r.accepted;
            t.rejected += r.rejected;
            t.persisted += r.persisted;
            t.quarantined += r.quarantined;
            t.fetch_errors += r.fetch_errors;
            t.persist_errors += r.persist_errors;
            if matches!(r.status, ConnectorStatus::Failed(_)) {
                t.failed_connectors += 1;
            }
            t
        })
    }

    #[must_use]
    pub fn report(&self, name: &str) -> Option<&ConnectorReport> {
        self.reports.iter().find(|r| r.name == name)
    }
}

struct RunContext {
    vocabulary: QueryVocabulary,
    gatekeeper: Arc<Gatekeeper>,
    gateway: PersistenceGateway,
    controller: PaginationController,
    settings: IngestSettings,
}

struct ConnectorOutcome {
    report: ConnectorReport,
    would_persist: Vec<AnalyzedPost>,
}

pub struct Orchestrator {
    connectors: Vec<Arc<dyn SourceConnector>>,
    ctx: Arc<RunContext>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        connectors: Vec<Arc<dyn SourceConnector>>,
        vocabulary: QueryVocabulary,
        gatekeeper: Arc<Gatekeeper>,
        gateway: PersistenceGateway,
        controller: PaginationController,
        settings: IngestSettings,
    ) -> Self {
        Self {
            connectors,
            ctx: Arc::new(RunContext {
                vocabulary,
                gatekeeper,
                gateway,
                controller,
                settings,
            }),
        }
    }

    /// Run every connector once and report what happened.
    pub async fn run(&self) -> RunSummary {
        let max_concurrent = self.ctx.settings.max_concurrent_connectors.max(1);
        tracing::info!(
            connectors = self.connectors.len(),
            max_concurrent,
            dry_run = self.ctx.settings.dry_run,
            "ingest run started"
        );

        let outcomes: Vec<ConnectorOutcome> = stream::iter(self.connectors.iter().cloned())
            .map(|connector| {
                let ctx = Arc::clone(&self.ctx);
                let name = connector.name();
                async move {
                    match tokio::spawn(run_connector(connector, ctx)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let err = ConnectorError::Aborted {
                                connector: name.to_string(),
                                reason: e.to_string(),
                            };
                            tracing::error!(connector = name, error = %err, "connector task aborted");
                            ConnectorOutcome {
                                report: ConnectorReport::failed(name, err.to_string()),
                                would_persist: Vec::new(),
                            }
                        }
                    }
                }
            })
            .buffered(max_concurrent)
            .collect()
            .await;

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut would_persist = Vec::new();
        for outcome in outcomes {
            reports.push(outcome.report);
            would_persist.extend(outcome.would_persist);
        }

        let summary = RunSummary {
            reports,
            dry_run: self.ctx.settings.dry_run,
            would_persist: dedup_last_wins(would_persist),
        };
        let totals = summary.totals();
        tracing::info!(
            fetched = totals.fetched,
            accepted = totals.accepted,
            rejected = totals.rejected,
            persisted = totals.persisted,
            failed_connectors = totals.failed_connectors,
            "ingest run finished"
        );
        summary
    }
}

async fn run_connector(
    connector: Arc<dyn SourceConnector>,
    ctx: Arc<RunContext>,
) -> ConnectorOutcome {
    let name = connector.name();
    let mut report = ConnectorReport::new(name);
    let mut would_persist = Vec::new();

    let shards = match connector.plan(&ctx.vocabulary) {
        Ok(shards) => shards,
        Err(e) => {
            tracing::warn!(connector = name, error = %e, "connector could not plan queries");
            return ConnectorOutcome {
                report: ConnectorReport::failed(name, e.to_string()),
                would_persist,
            };
        }
    };
    report.shards = shards.len();

    let host = connector.rate_key();
    let deadline = ctx.settings.connector_deadline.map(|d| Instant::now() + d);
    tracing::info!(connector = name, shards = shards.len(), host = %host, "connector started");

    'shards: for shard in &shards {
        let mut cursor = SourceCursor::default();
        while ctx.controller.should_continue(&cursor) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::warn!(connector = name, shard = %shard.label, "connector deadline reached");
                report.status = ConnectorStatus::DeadlineReached;
                break 'shards;
            }

            ctx.controller.pace(&host).await;
            let mut page = match connector.fetch_page(shard, &cursor).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        connector = name,
                        shard = %shard.label,
                        page = cursor.pages_issued,
                        error = %e,
                        "page fetch failed; abandoning shard"
                    );
                    report.fetch_errors += 1;
                    break;
                }
            };

            report.pages += 1;
            report.fetched += page.items.len() + page.parse_failures.len();
            report.parse_skipped += page.parse_failures.len();
            for failure in &page.parse_failures {
                tracing::debug!(connector = name, error = %failure, "item skipped");
            }
            cursor.record_page(page.items.len(), page.next_cursor.take());

            let accepted = classify_page(
                connector.as_ref(),
                &ctx.gatekeeper,
                std::mem::take(&mut page.items),
                &mut report,
            )
            .await;
            if accepted.is_empty() {
                continue;
            }

            if ctx.settings.dry_run {
                would_persist.extend(accepted);
            } else {
                let outcome = ctx.gateway.upsert_batch(accepted).await;
                report.persisted += outcome.persisted;
                report.quarantined += outcome.quarantined;
                if outcome.failed {
                    report.persist_errors += 1;
                }
            }
        }
    }

    tracing::info!(
        connector = name,
        status = %report.status,
        pages = report.pages,
        fetched = report.fetched,
        accepted = report.accepted,
        rejected = report.rejected,
        persisted = report.persisted,
        "connector finished"
    );
    ConnectorOutcome {
        report,
        would_persist,
    }
}

async fn classify_page(
    connector: &dyn SourceConnector,
    gatekeeper: &Gatekeeper,
    items: Vec<RawItem>,
    report: &mut ConnectorReport,
) -> Vec<AnalyzedPost> {
    let mut accepted = Vec::new();
    for item in items {
        let candidate = match connector.normalize(item) {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::debug!(connector = connector.name(), error = %e, "item skipped");
                report.parse_skipped += 1;
                continue;
            }
        };

        let analysis = gatekeeper.classify(&candidate.classification_text).await;
        if analysis.is_relevant {
            report.accepted += 1;
            accepted.push(AnalyzedPost::new(candidate, analysis));
        } else {
            report.rejected += 1;
        }
    }
    accepted
}
