//! HTTP embedding provider for an external model service.
//!
//! Sends `{"texts": [...]}` to the configured endpoint in one POST and expects
//! `{"embeddings": [[...], ...]}` back. The returned count is not checked here;
//! the batch coordinator owns that validation.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

use super::{model_id, EmbeddingProvider};
use crate::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct RemoteEmbeddingProvider {
    client: Client,
    runtime: Handle,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl RemoteEmbeddingProvider {
    /// Must be called from inside a Tokio runtime; requests are driven on that runtime
    /// from the blocking thread that calls [`EmbeddingProvider::embed_batch`].
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .context("remote embedding provider requires a running Tokio runtime")?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("failed to build HTTP client")?;

        tracing::info!(endpoint = %config.endpoint, "remote embedding provider configured");

        Ok(Self {
            client,
            runtime,
            endpoint: config.endpoint.clone(),
            model: model_id("remote", &config.model, config.dimensions),
            dimensions: config.dimensions,
        })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { texts })
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("model service returned HTTP {status}: {body}");
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("malformed embedding response")?;
        Ok(parsed.embeddings)
    }
}

impl EmbeddingProvider for RemoteEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        tracing::debug!(batch = texts.len(), endpoint = %self.endpoint, "remote embedding batch");
        self.runtime.block_on(self.request(texts))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
