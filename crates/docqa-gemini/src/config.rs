//! Gemini configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use url::Url;

use docqa_core::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Configuration for the Gemini API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub embedding_model: String,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl GeminiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::Configuration("GEMINI_API_KEY environment variable not found".to_string())
            })?;

        let config = Self {
            api_key,
            api_url: env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            embedding_model: env::var("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string()),
            request_timeout: Duration::from_secs(60),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url).map_err(|e| {
            Error::Configuration(format!("GEMINI_API_URL '{}' is invalid: {}", self.api_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "GEMINI_API_URL must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.model.trim().is_empty() || self.embedding_model.trim().is_empty() {
            return Err(Error::Configuration("model names must not be empty".to_string()));
        }
        Ok(())
    }

    /// URL of `method` on `model`, e.g. `.../models/gemini-1.5-flash:generateContent`
    pub fn endpoint(&self, model: &str, method: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!(
            "{}/models/{}:{}",
            self.api_url.trim_end_matches('/'),
            model,
            method
        )
    }
}
