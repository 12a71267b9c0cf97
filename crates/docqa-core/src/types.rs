//! Common types used across the docqa pipeline

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A fragment of a source document.
///
/// `source_offset` counts characters, not bytes, from the start of the
/// document the chunk was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: u64,
    pub source_offset: usize,
    pub text: String,
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Arc<Chunk>,
    pub vector: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: impl Into<Arc<Chunk>>, vector: Vec<f32>) -> Self {
        Self {
            chunk: chunk.into(),
            vector,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// One ranked hit of a nearest-neighbour search.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub rank: usize,
    pub chunk: Arc<Chunk>,
    pub distance: f32,
}
