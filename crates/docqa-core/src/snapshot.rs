//! Corpus snapshot written for inspection (`parsed_chunks.json`)
//!
//! The snapshot is a debugging artifact. Nothing in the retrieval path reads
//! it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{Chunk, Result};

/// Default file name for written snapshots.
pub const DEFAULT_SNAPSHOT_FILE: &str = "parsed_chunks.json";

/// One chunk as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: u64,
    pub text: String,
}

impl From<&Chunk> for ChunkRecord {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id,
            text: chunk.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSnapshot {
    pub created_at: DateTime<Utc>,
    pub chunk_size: usize,
    pub overlap: usize,
    pub chunks: Vec<ChunkRecord>,
}

impl CorpusSnapshot {
    pub fn new<'a>(
        chunk_size: usize,
        overlap: usize,
        chunks: impl IntoIterator<Item = &'a Chunk>,
    ) -> Self {
        Self {
            created_at: Utc::now(),
            chunk_size,
            overlap,
            chunks: chunks.into_iter().map(ChunkRecord::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Write the snapshot as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), chunks = self.len(), "wrote corpus snapshot");
        Ok(())
    }

    /// Read a snapshot previously written with [`CorpusSnapshot::write_json`]
    pub fn read_json(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
