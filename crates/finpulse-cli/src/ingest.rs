//! `finpulse ingest`: one full pass over the source connectors.
//!
//! Only startup problems (configuration, vocabulary, classifier, database)
//! fail the command. Connector failures show up in the summary table and the
//! process still exits 0.

use std::fmt::Write as _;
use std::sync::Arc;

use finpulse_core::AppConfig;
use finpulse_ingest::{
    build_gatekeeper, default_connectors, IngestSettings, MemoryPostStore, Orchestrator,
    PaginationController, PersistenceGateway, PostStore, RequestPacer, RunSummary,
    SourceConnector, SourceHttp, CONNECTOR_ORDER,
};

use crate::store::PgPostStore;

/// Keep the connectors named in `only`, in run order. An empty filter keeps
/// every connector.
///
/// # Errors
///
/// Returns an error naming the first filter entry that is not a known
/// connector.
pub(crate) fn select_connectors(
    connectors: Vec<Arc<dyn SourceConnector>>,
    only: &[String],
) -> anyhow::Result<Vec<Arc<dyn SourceConnector>>> {
    if only.is_empty() {
        return Ok(connectors);
    }
    if let Some(unknown) = only
        .iter()
        .find(|name| !CONNECTOR_ORDER.contains(&name.as_str()))
    {
        anyhow::bail!(
            "unknown connector '{unknown}'; expected one of: {}",
            CONNECTOR_ORDER.join(", ")
        );
    }
    Ok(connectors
        .into_iter()
        .filter(|c| only.iter().any(|name| name == c.name()))
        .collect())
}

/// Run every selected connector once, printing a per-connector table.
///
/// # Errors
///
/// Returns an error if the vocabulary cannot be loaded, the `--only` filter
/// names an unknown connector, a required classifier is unreachable, or the
/// database cannot be reached for a non-dry run.
pub(crate) async fn run_ingest(
    config: &AppConfig,
    dry_run_flag: bool,
    only: &[String],
) -> anyhow::Result<()> {
    let dry_run = dry_run_flag || config.dry_run;
    let vocabulary = finpulse_core::load_vocabulary(&config.keywords_path)?;
    tracing::info!(
        keywords = vocabulary.keywords.len(),
        hashtags = vocabulary.hashtags.len(),
        origin = ?vocabulary.origin,
        "vocabulary loaded"
    );

    let http = SourceHttp::new(config.request_timeout_secs, &config.user_agent)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    let connectors = select_connectors(
        default_connectors(&http, config.archive_floor_year),
        only,
    )?;

    let gatekeeper =
        build_gatekeeper(&config.classifier, &vocabulary, config.request_timeout_secs).await?;

    let store: Arc<dyn PostStore> = if dry_run {
        Arc::new(MemoryPostStore::new())
    } else {
        let pool = crate::connect(config).await?;
        finpulse_db::run_migrations(&pool).await?;
        Arc::new(PgPostStore::new(pool))
    };

    let pacer = Arc::new(RequestPacer::new(
        config.inter_request_delay,
        config.request_jitter,
    ));
    let settings = IngestSettings {
        dry_run,
        ..IngestSettings::from_app_config(config)
    };
    let orchestrator = Orchestrator::new(
        connectors,
        vocabulary,
        Arc::new(gatekeeper),
        PersistenceGateway::new(store),
        PaginationController::new(config.max_pages_per_query, pacer),
        settings,
    );

    let summary = orchestrator.run().await;
    print!("{}", render_summary(&summary));
    Ok(())
}

/// Per-connector table plus a totals line.
pub(crate) fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<19}{:>7}{:>8}{:>9}{:>9}{:>10}{:>8}{:>8}  STATUS",
        "CONNECTOR", "PAGES", "FETCHED", "SKIPPED", "ACCEPTED", "REJECTED", "STORED", "ERRORS"
    );
    for r in &summary.reports {
        let _ = writeln!(
            out,
            "{:<19}{:>7}{:>8}{:>9}{:>9}{:>10}{:>8}{:>8}  {}",
            r.name,
            r.pages,
            r.fetched,
            r.parse_skipped,
            r.accepted,
            r.rejected,
            r.persisted,
            r.fetch_errors + r.persist_errors,
            r.status
        );
    }

    let t = summary.totals();
    let _ = writeln!(
        out,
        "{:<19}{:>7}{:>8}{:>9}{:>9}{:>10}{:>8}{:>8}  {} failed",
        "TOTAL",
        summary.reports.iter().map(|r| r.pages).sum::<usize>(),
        t.fetched,
        t.parse_skipped,
        t.accepted,
        t.rejected,
        t.persisted,
        t.fetch_errors + t.persist_errors,
        t.failed_connectors
    );

    if summary.dry_run {
        let _ = writeln!(
            out,
            "dry-run: {} unique posts would be stored; nothing was written",
            summary.would_persist.len()
        );
    }
    if t.quarantined > 0 {
        let _ = writeln!(out, "quarantined: {} incomplete records", t.quarantined);
    }
    out
}
