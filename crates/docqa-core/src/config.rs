//! Retrieval pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::{Chunker, Error, Result};

/// Settings shared by ingestion, retrieval and answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub embed_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: 3,
            embed_timeout: Duration::from_secs(30),
            generate_timeout: Duration::from_secs(60),
        }
    }
}

impl RetrievalConfig {
    /// Create configuration from environment variables, falling back to defaults
    ///
    /// Reads `DOCQA_CHUNK_SIZE`, `DOCQA_CHUNK_OVERLAP`, `DOCQA_TOP_K`,
    /// `DOCQA_EMBED_TIMEOUT_SECS` and `DOCQA_GENERATE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            chunk_size: env_or("DOCQA_CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: env_or("DOCQA_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: env_or("DOCQA_TOP_K", defaults.top_k)?,
            embed_timeout: Duration::from_secs(env_or(
                "DOCQA_EMBED_TIMEOUT_SECS",
                defaults.embed_timeout.as_secs(),
            )?),
            generate_timeout: Duration::from_secs(env_or(
                "DOCQA_GENERATE_TIMEOUT_SECS",
                defaults.generate_timeout.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the settings without building anything
    pub fn validate(&self) -> Result<()> {
        self.chunker()?;
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Build the chunker these settings describe
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunk_size, self.chunk_overlap)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        Err(_) => Ok(default),
    }
}
