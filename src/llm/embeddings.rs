use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

/// Turns a search query into the vector space of the stored package
/// embeddings.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Ollama,
    OpenAi,
}

impl Provider {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Ollama => "/api/embed",
            Self::OpenAi => "/v1/embeddings",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAi => "OpenAI",
        }
    }
}

/// Both APIs accept a bare string as `input`. Only Ollama knows `truncate`.
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncate: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Ollama { embeddings: Vec<Vec<f32>> },
    OpenAi { data: Vec<OpenAiEmbedding> },
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl EmbedResponse {
    fn into_first(self) -> Option<Vec<f32>> {
        match self {
            Self::Ollama { embeddings } => embeddings.into_iter().next(),
            Self::OpenAi { data } => data.into_iter().next().map(|d| d.embedding),
        }
    }
}

/// Embedder that calls Ollama or an OpenAI-compatible API.
pub struct LlmEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl LlmEmbedder {
    pub fn new(client: reqwest::Client, config: EmbeddingConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl QueryEmbedder for LlmEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let provider = Provider::parse(&self.config.provider)?;
        let url = format!("{}{}", self.config.base_url, provider.path());
        let req = EmbedRequest {
            model: &self.config.model,
            input: query,
            truncate: (provider == Provider::Ollama).then_some(true),
        };

        let mut builder = self.client.post(&url).json(&req);
        if let Some(key) = self.config.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Failed to call {} embed API", provider.label()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} embed API returned {status}: {body}", provider.label());
        }

        let body: EmbedResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse {} embed response", provider.label()))?;
        body.into_first().context("No embedding returned")
    }
}
