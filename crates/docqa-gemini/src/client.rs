//! Gemini generation client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use docqa_core::{Error, GenerationConfig, GenerationResult, Generator, Result};

use crate::config::GeminiConfig;

/// Gemini `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub(crate) text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<&'static str>,
    pub(crate) parts: Vec<Part>,
}

impl Content {
    pub(crate) fn text(role: Option<&'static str>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

impl GenerateContentRequest {
    fn new(prompt: &str, config: &GenerationConfig) -> Self {
        Self {
            contents: vec![Content::text(Some("user"), prompt)],
            generation_config: GenerationParams {
                max_output_tokens: config.max_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                stop_sequences: config.stop_sequences.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: ResponseContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Result<(String, Option<u32>)> {
        let tokens = self.usage_metadata.and_then(|u| u.total_token_count);

        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(Error::Provider(format!("Gemini returned no answer: {}", reason)));
        };

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(Error::Provider(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok((text, tokens))
    }
}

impl GeminiClient {
    /// Create a new Gemini client from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;
        let client = build_http_client(&config)?;
        Ok(Self { config, client })
    }

    /// Create a new Gemini client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let url = self.config.endpoint(&config.model_id, "generateContent");
        let request = GenerateContentRequest::new(prompt, config);

        tracing::debug!(model = %config.model_id, "calling generateContent");
        let response: GenerateContentResponse =
            post_json(&self.client, &self.config, &url, &request).await?;
        let (text, tokens_used) = response.into_text()?;

        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

pub(crate) fn build_http_client(config: &GeminiConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| Error::Provider(e.to_string()))
}

/// POST `body` as JSON and decode the JSON reply
pub(crate) async fn post_json<B, R>(
    client: &Client,
    config: &GeminiConfig,
    url: &str,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", &config.api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| Error::Provider(format!("request to Gemini failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(%status, "Gemini API request failed");
        return Err(Error::Provider(format!(
            "Gemini API request failed with status {}: {}",
            status,
            error_text.trim()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| Error::Serialization(format!("invalid Gemini response: {}", e)))
}
