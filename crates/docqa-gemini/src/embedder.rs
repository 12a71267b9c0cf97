//! Gemini embedding client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docqa_core::{Embedder, Error, Result};

use crate::client::{Content, build_http_client, post_json};
use crate::config::GeminiConfig;

/// Upper bound on texts per `batchEmbedContents` call
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

/// Embedder backed by Gemini `batchEmbedContents`
///
/// Documents are embedded with the retrieval-document task type and single
/// queries with the retrieval-query one, so both land in the same space.
pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: Client,
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    fn batch_request(&self, texts: &[String], task_type: TaskType) -> BatchEmbedRequest {
        let model = self.config.embedding_model.trim_start_matches("models/");
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", model),
                    content: Content::text(None, text),
                    task_type,
                })
                .collect(),
        }
    }

    async fn embed_texts(&self, texts: &[String], task_type: TaskType) -> Result<Vec<Vec<f32>>> {
        let url = self
            .config
            .endpoint(&self.config.embedding_model, "batchEmbedContents");
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            tracing::debug!(texts = batch.len(), "calling batchEmbedContents");
            let request = self.batch_request(batch, task_type);
            let response: BatchEmbedResponse =
                post_json(&self.client, &self.config, &url, &request).await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::Provider(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text.to_string()], TaskType::RetrievalQuery)
            .await?
            .pop()
            .ok_or_else(|| Error::Provider("Gemini returned no embedding".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_texts(texts, TaskType::RetrievalDocument).await
    }
}
