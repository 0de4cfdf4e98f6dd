//! Shared domain types and configuration for finpulse.

pub mod app_config;
pub mod config;
pub mod posts;
pub mod vocabulary;

use thiserror::Error;

pub use app_config::{AppConfig, ClassifierSettings, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use posts::{
    canonical_key, AnalysisResult, AnalyzedPost, CandidatePost, Metrics, NaturalId, Platform,
    SentimentClass,
};
pub use vocabulary::{load_vocabulary, QueryVocabulary, VocabularyOrigin};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read vocabulary file {path}: {source}")]
    VocabularyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vocabulary file: {0}")]
    VocabularyFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("classifier is required but unavailable: {0}")]
    ClassifierUnavailable(String),
}
