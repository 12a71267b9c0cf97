//! Gemini integration for docqa
//!
//! This crate provides the Gemini implementations of the [`Embedder`] and
//! [`Generator`] traits.

mod client;
mod config;
mod embedder;

#[cfg(test)]
mod tests;

pub use client::GeminiClient;
pub use config::{DEFAULT_API_URL, DEFAULT_EMBEDDING_MODEL, DEFAULT_MODEL, GeminiConfig};
pub use embedder::{GeminiEmbedder, MAX_BATCH_SIZE};

// Re-export core types for convenience
pub use docqa_core::{Embedder, Error, GenerationConfig, GenerationResult, Generator, Result};
