use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Inference-server settings for the relevance and sentiment models.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Base URL of the inference server. `None` runs on keyword fallbacks only.
    pub url: Option<String>,
    /// Abort startup when no model answers the startup probe.
    pub required: bool,
    pub relevance_model: String,
    pub sentiment_model: String,
    /// Size of the inference worker pool.
    pub workers: usize,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub dry_run: bool,
    pub keywords_path: PathBuf,
    pub max_pages_per_query: u32,
    pub request_timeout_secs: u64,
    pub inter_request_delay: Duration,
    pub request_jitter: bool,
    pub user_agent: String,
    pub archive_floor_year: i32,
    pub classifier: ClassifierSettings,
    pub max_concurrent_connectors: usize,
    pub connector_deadline: Option<Duration>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Return the database URL, failing when persistence is needed but unconfigured.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::MissingEnvVar`] if `DATABASE_URL` was not set.
    pub fn require_database_url(&self) -> Result<&str, crate::ConfigError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| crate::ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("dry_run", &self.dry_run)
            .field("keywords_path", &self.keywords_path)
            .field("max_pages_per_query", &self.max_pages_per_query)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("inter_request_delay", &self.inter_request_delay)
            .field("request_jitter", &self.request_jitter)
            .field("user_agent", &self.user_agent)
            .field("archive_floor_year", &self.archive_floor_year)
            .field("classifier", &self.classifier)
            .field("max_concurrent_connectors", &self.max_concurrent_connectors)
            .field("connector_deadline", &self.connector_deadline)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
