//! HTTP client for a Hugging Face compatible inference server.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{LabelScore, RelevanceModel, SentimentModel};
use crate::error::ClassifierError;

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
}

#[derive(Serialize)]
struct TextRequest<'a> {
    inputs: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns { labels: Vec<String>, scores: Vec<f32> },
    Rows(Vec<LabelScore>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Shared connection to the inference server.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    base_url: String,
}

impl InferenceClient {
    /// # Errors
    ///
    /// Returns [`ClassifierError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        model: &str,
        body: &B,
    ) -> Result<R, ClassifierError> {
        let url = format!("{}/models/{model}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("{model}: request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "{model}: server returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ClassifierError::Response(format!("{model}: {e}")))
    }
}

/// Zero-shot topic model reached over HTTP.
pub struct HttpRelevanceModel {
    client: InferenceClient,
    model: String,
}

impl HttpRelevanceModel {
    #[must_use]
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl RelevanceModel for HttpRelevanceModel {
    async fn score_labels(
        &self,
        text: &str,
        labels: &[&str],
    ) -> Result<Vec<LabelScore>, ClassifierError> {
        let request = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: labels,
            },
        };
        let response: ZeroShotResponse = self.client.post(&self.model, &request).await?;
        let scores = match response {
            ZeroShotResponse::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(ClassifierError::Response(format!(
                        "{}: {} labels for {} scores",
                        self.model,
                        labels.len(),
                        scores.len()
                    )));
                }
                labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| LabelScore { label, score })
                    .collect()
            }
            ZeroShotResponse::Rows(rows) => rows,
        };
        Ok(scores)
    }
}

/// Three-way financial sentiment model reached over HTTP.
pub struct HttpSentimentModel {
    client: InferenceClient,
    model: String,
}

impl HttpSentimentModel {
    #[must_use]
    pub fn new(client: InferenceClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    async fn classify_sentiment(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
        let response: TextClassificationResponse = self
            .client
            .post(&self.model, &TextRequest { inputs: text })
            .await?;
        Ok(match response {
            TextClassificationResponse::Nested(mut outer) => {
                if outer.is_empty() {
                    Vec::new()
                } else {
                    outer.swap_remove(0)
                }
            }
            TextClassificationResponse::Flat(rows) => rows,
        })
    }
}
