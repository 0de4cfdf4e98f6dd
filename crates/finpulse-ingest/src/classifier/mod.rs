//! Relevance gatekeeper and sentiment classification.
//!
//! Every text goes through two short-circuiting stages: a zero-shot topic
//! check, then (for accepted text only) three-way sentiment. Each stage has
//! a keyword fallback that takes over when its model is unreachable, either
//! from startup or after the first failed call of the run.

mod inference;
mod lexicon;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use finpulse_core::{AnalysisResult, ClassifierSettings, ConfigError, QueryVocabulary, SentimentClass};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::ClassifierError;

pub use inference::{HttpRelevanceModel, HttpSentimentModel, InferenceClient};
pub use lexicon::{lexicon_score, lexicon_sentiment, FinanceVocabulary, FALLBACK_CONFIDENCE};

/// The label a relevant text must win (or not lose confidently).
pub const TARGET_LABEL: &str = "financial market and economy";

/// Zero-shot candidate labels, target first.
pub const CANDIDATE_LABELS: &[&str] = &[
    TARGET_LABEL,
    "personal life and relationships",
    "entertainment and movies",
    "gaming",
    "general discussion",
];

/// An off-topic top label above this score rejects the text.
pub const OFF_TOPIC_THRESHOLD: f32 = 0.4;

/// Texts with fewer whitespace-separated tokens are rejected outright.
pub const MIN_TOKENS: usize = 3;

const PROBE_TEXT: &str = "The stock market rallied after the central bank held interest rates.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

#[async_trait]
pub trait RelevanceModel: Send + Sync {
    /// Score `text` against each of `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the model cannot be reached or answers
    /// with something other than label scores.
    async fn score_labels(
        &self,
        text: &str,
        labels: &[&str],
    ) -> Result<Vec<LabelScore>, ClassifierError>;
}

#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Positive/negative/neutral scores for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the model cannot be reached or answers
    /// with something other than label scores.
    async fn classify_sentiment(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError>;
}

/// Which stages are backed by a live model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierCapability {
    pub relevance_model: bool,
    pub sentiment_model: bool,
}

/// Relevance verdict from zero-shot scores, or `None` when there are none.
///
/// Relevant iff the top label is the target, or the top label is off-topic
/// with a score of at most [`OFF_TOPIC_THRESHOLD`].
#[must_use]
pub fn relevance_decision(scores: &[LabelScore]) -> Option<bool> {
    let top = scores.iter().max_by(|a, b| a.score.total_cmp(&b.score))?;
    Some(top.label == TARGET_LABEL || top.score <= OFF_TOPIC_THRESHOLD)
}

fn top_sentiment(scores: &[LabelScore]) -> Option<(SentimentClass, f32)> {
    let top = scores.iter().max_by(|a, b| a.score.total_cmp(&b.score))?;
    SentimentClass::from_label(&top.label).map(|class| (class, top.score))
}

pub struct Gatekeeper {
    relevance: Option<Arc<dyn RelevanceModel>>,
    sentiment: Option<Arc<dyn SentimentModel>>,
    relevance_down: AtomicBool,
    sentiment_down: AtomicBool,
    permits: Semaphore,
    vocabulary: FinanceVocabulary,
}

impl Gatekeeper {
    /// A gatekeeper backed by the given models, `workers` concurrent calls.
    #[must_use]
    pub fn new(
        relevance: Option<Arc<dyn RelevanceModel>>,
        sentiment: Option<Arc<dyn SentimentModel>>,
        workers: usize,
        vocabulary: &QueryVocabulary,
    ) -> Self {
        Self {
            relevance,
            sentiment,
            relevance_down: AtomicBool::new(false),
            sentiment_down: AtomicBool::new(false),
            permits: Semaphore::new(workers.max(1)),
            vocabulary: FinanceVocabulary::new(&vocabulary.keywords),
        }
    }

    /// A gatekeeper that only uses the keyword fallbacks.
    #[must_use]
    pub fn fallback_only(vocabulary: &QueryVocabulary) -> Self {
        Self::new(None, None, 1, vocabulary)
    }

    /// Stages currently served by a model.
    #[must_use]
    pub fn capability(&self) -> ClassifierCapability {
        ClassifierCapability {
            relevance_model: self.relevance.is_some() && !self.relevance_down.load(Ordering::Acquire),
            sentiment_model: self.sentiment.is_some() && !self.sentiment_down.load(Ordering::Acquire),
        }
    }

    /// Classify one text. Never fails: a model problem switches that stage to
    /// its fallback.
    pub async fn classify(&self, text: &str) -> AnalysisResult {
        let text = text.trim();
        if text.split_whitespace().count() < MIN_TOKENS {
            return AnalysisResult::rejected();
        }
        if !self.is_relevant(text).await {
            return AnalysisResult::rejected();
        }
        let (class, confidence) = self.sentiment(text).await;
        AnalysisResult::accepted(text, class, confidence)
    }

    async fn is_relevant(&self, text: &str) -> bool {
        if let Some(model) = live_model(self.relevance.as_ref(), &self.relevance_down) {
            if let Ok(_permit) = self.permits.acquire().await {
                let verdict = match model.score_labels(text, CANDIDATE_LABELS).await {
                    Ok(scores) => relevance_decision(&scores).ok_or_else(|| {
                        ClassifierError::Response("empty label scores".to_string())
                    }),
                    Err(e) => Err(e),
                };
                match verdict {
                    Ok(relevant) => return relevant,
                    Err(e) => mark_down(&self.relevance_down, "relevance", &e),
                }
            }
        }
        self.vocabulary.mentions_finance(text)
    }

    async fn sentiment(&self, text: &str) -> (SentimentClass, f32) {
        if let Some(model) = live_model(self.sentiment.as_ref(), &self.sentiment_down) {
            if let Ok(_permit) = self.permits.acquire().await {
                let verdict = match model.classify_sentiment(text).await {
                    Ok(scores) => top_sentiment(&scores).ok_or_else(|| {
                        ClassifierError::Response("no recognised sentiment label".to_string())
                    }),
                    Err(e) => Err(e),
                };
                match verdict {
                    Ok(result) => return result,
                    Err(e) => mark_down(&self.sentiment_down, "sentiment", &e),
                }
            }
        }
        lexicon_sentiment(text)
    }
}

fn live_model<'a, M: ?Sized>(model: Option<&'a Arc<M>>, down: &AtomicBool) -> Option<&'a Arc<M>> {
    model.filter(|_| !down.load(Ordering::Acquire))
}

fn mark_down(flag: &AtomicBool, stage: &'static str, error: &ClassifierError) {
    if !flag.swap(true, Ordering::AcqRel) {
        tracing::warn!(
            stage,
            error = %error,
            "model call failed; using keyword fallback for the rest of the run"
        );
    }
}

/// Build the gatekeeper for a run, probing each configured model once.
///
/// With no classifier URL both stages use their fallbacks.
///
/// # Errors
///
/// Returns [`ConfigError::ClassifierUnavailable`] when `settings.required`
/// is set and no model answers the probe.
pub async fn build_gatekeeper(
    settings: &ClassifierSettings,
    vocabulary: &QueryVocabulary,
    timeout_secs: u64,
) -> Result<Gatekeeper, ConfigError> {
    let Some(url) = settings.url.as_deref() else {
        if settings.required {
            return Err(ConfigError::ClassifierUnavailable(
                "FINPULSE_CLASSIFIER_URL is not set".to_string(),
            ));
        }
        tracing::info!("no classifier configured; using keyword fallbacks");
        return Ok(Gatekeeper::fallback_only(vocabulary));
    };

    let client = InferenceClient::new(url, timeout_secs)
        .map_err(|e| ConfigError::ClassifierUnavailable(e.to_string()))?;
    let relevance: Arc<dyn RelevanceModel> =
        Arc::new(HttpRelevanceModel::new(client.clone(), &settings.relevance_model));
    let sentiment: Arc<dyn SentimentModel> =
        Arc::new(HttpSentimentModel::new(client, &settings.sentiment_model));

    let relevance = match relevance.score_labels(PROBE_TEXT, CANDIDATE_LABELS).await {
        Ok(_) => Some(relevance),
        Err(e) => {
            tracing::warn!(model = %settings.relevance_model, error = %e, "relevance model probe failed");
            None
        }
    };
    let sentiment = match sentiment.classify_sentiment(PROBE_TEXT).await {
        Ok(_) => Some(sentiment),
        Err(e) => {
            tracing::warn!(model = %settings.sentiment_model, error = %e, "sentiment model probe failed");
            None
        }
    };

    if settings.required && relevance.is_none() && sentiment.is_none() {
        return Err(ConfigError::ClassifierUnavailable(format!(
            "no model reachable at {url}"
        )));
    }

    let gatekeeper = Gatekeeper::new(relevance, sentiment, settings.workers, vocabulary);
    let capability = gatekeeper.capability();
    tracing::info!(
        relevance_model = capability.relevance_model,
        sentiment_model = capability.sentiment_model,
        workers = settings.workers,
        "classifier ready"
    );
    Ok(gatekeeper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f32)]) -> Vec<LabelScore> {
        pairs
            .iter()
            .map(|(label, score)| LabelScore {
                label: (*label).to_string(),
                score: *score,
            })
            .collect()
    }

    #[test]
    fn target_label_on_top_is_relevant() {
        let s = scores(&[(TARGET_LABEL, 0.3), ("gaming", 0.2)]);
        assert_eq!(relevance_decision(&s), Some(true));
    }

    #[test]
    fn confident_off_topic_label_rejects() {
        let s = scores(&[("gaming", 0.41), (TARGET_LABEL, 0.2)]);
        assert_eq!(relevance_decision(&s), Some(false));
    }

    #[test]
    fn weak_off_topic_label_at_threshold_keeps_text() {
        let s = scores(&[("general discussion", 0.4), (TARGET_LABEL, 0.35)]);
        assert_eq!(relevance_decision(&s), Some(true));
    }

    #[test]
    fn empty_scores_have_no_verdict() {
        assert_eq!(relevance_decision(&[]), None);
    }

    #[test]
    fn top_sentiment_maps_label_and_score() {
        let s = scores(&[("negative", 0.1), ("positive", 0.85), ("neutral", 0.05)]);
        assert_eq!(top_sentiment(&s), Some((SentimentClass::Positive, 0.85)));
        assert_eq!(top_sentiment(&scores(&[("LABEL_0", 0.9)])), None);
    }

    #[tokio::test]
    async fn unconfigured_classifier_uses_fallbacks() {
        let settings = ClassifierSettings {
            url: None,
            required: false,
            relevance_model: "r".to_string(),
            sentiment_model: "s".to_string(),
            workers: 2,
        };
        let gatekeeper = build_gatekeeper(&settings, &QueryVocabulary::fallback(), 1)
            .await
            .expect("fallback gatekeeper");
        assert_eq!(gatekeeper.capability(), ClassifierCapability::default());
    }

    #[tokio::test]
    async fn required_classifier_without_url_fails_startup() {
        let settings = ClassifierSettings {
            url: None,
            required: true,
            relevance_model: "r".to_string(),
            sentiment_model: "s".to_string(),
            workers: 2,
        };
        let err = build_gatekeeper(&settings, &QueryVocabulary::fallback(), 1)
            .await
            .err()
            .expect("startup error");
        assert!(matches!(err, ConfigError::ClassifierUnavailable(_)));
    }
}
