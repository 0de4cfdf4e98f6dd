mod ingest;
mod query;
mod store;

use clap::{Parser, Subcommand};
use finpulse_core::Environment;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "finpulse")]
#[command(about = "Financial social-signal ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, classify and store posts from every source connector
    Ingest {
        /// Fetch and classify without writing to the database
        #[arg(long)]
        dry_run: bool,

        /// Run only the named connectors (repeatable)
        #[arg(long, value_name = "CONNECTOR")]
        only: Vec<String>,
    },
    /// Run one text through the relevance and sentiment gatekeeper
    Classify {
        /// Text to classify
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Apply pending database migrations
    Migrate,
    /// Show stored post counts per platform
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = finpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(ansi_logs(&config.env))
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    match cli.command {
        Commands::Ingest { dry_run, only } => ingest::run_ingest(&config, dry_run, &only).await,
        Commands::Classify { text } => query::run_classify(&config, &text.join(" ")).await,
        Commands::Migrate => query::run_migrate(&config).await,
        Commands::Status => query::run_status(&config).await,
    }
}

/// Colored log output everywhere except production, where logs go to a collector.
fn ansi_logs(env: &Environment) -> bool {
    !matches!(env, Environment::Production)
}

/// Connect to Postgres with the configured pool settings and check the
/// connection is live.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is unset, the connection fails or the
/// ping query fails.
pub(crate) async fn connect(config: &finpulse_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config.require_database_url()?;
    let pool_config = finpulse_db::PoolConfig::from_app_config(config);
    let pool = finpulse_db::connect_pool(database_url, pool_config).await?;
    finpulse_db::ping(&pool).await?;
    tracing::debug!("database connection verified");
    Ok(pool)
}
