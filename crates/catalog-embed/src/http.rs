//! Embedding gateway over an Ollama-compatible `/api/embeddings` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use catalog_core::config::EmbeddingSettings;
use catalog_core::error::{Error, Result};
use catalog_core::traits::Embedder;
use catalog_core::types::EmbeddingVector;

pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: &str, model: &str, dimension: usize, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
        })
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Self::new(&settings.base_url, &settings.model, settings.dimension, Duration::from_millis(settings.timeout_ms))
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn dimension(&self) -> usize { self.dimension }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = EmbeddingRequest { model: &self.model, prompt: text };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ProviderUnavailable(format!("request to {} timed out", self.endpoint))
                } else {
                    Error::ProviderUnavailable(format!("request to {} failed: {}", self.endpoint, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderError(format!("{} returned {}: {}", self.endpoint, status, body.trim())));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::ProviderError(format!("malformed embedding response: {}", e)))?;
        if parsed.embedding.is_empty() {
            return Err(Error::ProviderError("embedding response contained an empty vector".into()));
        }
        tracing::debug!(model = %self.model, dim = parsed.embedding.len(), "embedded text");
        Ok(parsed.embedding)
    }
}
