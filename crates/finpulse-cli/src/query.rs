use finpulse_core::AppConfig;
use finpulse_ingest::build_gatekeeper;

/// Print the gatekeeper verdict for `text` as JSON.
///
/// # Errors
///
/// Returns an error if the vocabulary cannot be loaded or a required
/// classifier is unreachable.
pub(crate) async fn run_classify(config: &AppConfig, text: &str) -> anyhow::Result<()> {
    let vocabulary = finpulse_core::load_vocabulary(&config.keywords_path)?;
    let gatekeeper =
        build_gatekeeper(&config.classifier, &vocabulary, config.request_timeout_secs).await?;

    let capability = gatekeeper.capability();
    let result = gatekeeper.classify(text).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !capability.relevance_model || !capability.sentiment_model {
        eprintln!(
            "note: keyword fallback in use (relevance model: {}, sentiment model: {})",
            capability.relevance_model, capability.sentiment_model
        );
    }
    Ok(())
}

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let applied = finpulse_db::run_migrations(&pool).await?;
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Show stored post counts per platform.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let counts = finpulse_db::count_by_platform(&pool).await?;

    if counts.is_empty() {
        println!("no posts stored; run `finpulse ingest` first");
        return Ok(());
    }

    println!("{:<16}POSTS", "PLATFORM");
    for row in &counts {
        println!("{:<16}{}", row.platform, row.posts);
    }
    println!("{:<16}{}", "TOTAL", counts.iter().map(|c| c.posts).sum::<i64>());
    Ok(())
}
