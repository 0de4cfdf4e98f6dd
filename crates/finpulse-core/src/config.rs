use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::app_config::{AppConfig, ClassifierSettings, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_value::<u64>(var, &or_default(var, default))
    };

    let parse_flag = |var: &str| -> Result<bool, ConfigError> {
        optional(var).map_or(Ok(false), |raw| parse_bool(var, &raw))
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("FINPULSE_ENV", "development"))?;
    let log_level = or_default("FINPULSE_LOG_LEVEL", "info");
    let dry_run = parse_flag("FINPULSE_DRY_RUN")?;
    let keywords_path = PathBuf::from(or_default(
        "FINPULSE_KEYWORDS_PATH",
        "./config/keywords.yaml",
    ));

    let max_pages_per_query = parse_value::<u32>(
        "FINPULSE_MAX_PAGES_PER_QUERY",
        &or_default("FINPULSE_MAX_PAGES_PER_QUERY", "20"),
    )?;
    if max_pages_per_query == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "FINPULSE_MAX_PAGES_PER_QUERY".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let request_timeout_secs = parse_num("FINPULSE_REQUEST_TIMEOUT_SECS", "10")?;
    let inter_request_delay = parse_delay(
        "FINPULSE_INTER_REQUEST_DELAY_SECS",
        &or_default("FINPULSE_INTER_REQUEST_DELAY_SECS", "1.0"),
    )?;
    let request_jitter = parse_flag("FINPULSE_REQUEST_JITTER")?;
    let user_agent = or_default("FINPULSE_USER_AGENT", "finpulse/0.1 (social-signal-ingest)");
    let archive_floor_year = parse_value::<i32>(
        "FINPULSE_ARCHIVE_FLOOR_YEAR",
        &or_default("FINPULSE_ARCHIVE_FLOOR_YEAR", "2005"),
    )?;

    let classifier = ClassifierSettings {
        url: optional("FINPULSE_CLASSIFIER_URL").map(|u| u.trim_end_matches('/').to_string()),
        required: parse_flag("FINPULSE_CLASSIFIER_REQUIRED")?,
        relevance_model: or_default(
            "FINPULSE_RELEVANCE_MODEL",
            "typeform/distilbert-base-uncased-mnli",
        ),
        sentiment_model: or_default("FINPULSE_SENTIMENT_MODEL", "ProsusAI/finbert"),
        workers: parse_positive_usize(
            "FINPULSE_CLASSIFIER_WORKERS",
            &or_default("FINPULSE_CLASSIFIER_WORKERS", "2"),
        )?,
    };

    let max_concurrent_connectors = parse_positive_usize(
        "FINPULSE_MAX_CONCURRENT_CONNECTORS",
        &or_default("FINPULSE_MAX_CONCURRENT_CONNECTORS", "1"),
    )?;
    let connector_deadline = optional("FINPULSE_CONNECTOR_DEADLINE_SECS")
        .map(|raw| parse_value::<u64>("FINPULSE_CONNECTOR_DEADLINE_SECS", &raw))
        .transpose()?
        .map(Duration::from_secs);

    let db_max_connections = parse_value::<u32>(
        "FINPULSE_DB_MAX_CONNECTIONS",
        &or_default("FINPULSE_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections = parse_value::<u32>(
        "FINPULSE_DB_MIN_CONNECTIONS",
        &or_default("FINPULSE_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs = parse_num("FINPULSE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        dry_run,
        keywords_path,
        max_pages_per_query,
        request_timeout_secs,
        inter_request_delay,
        request_jitter,
        user_agent,
        archive_floor_year,
        classifier,
        max_concurrent_connectors,
        connector_deadline,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive_usize(var: &str, raw: &str) -> Result<usize, ConfigError> {
    let value = parse_value::<usize>(var, raw)?;
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn parse_delay(var: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = parse_value::<f64>(var, raw)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a non-negative number of seconds, got {raw}"),
        });
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got {other}"),
        }),
    }
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FINPULSE_ENV".to_string(),
            reason: format!("unknown environment {other}"),
        }),
    }
}
