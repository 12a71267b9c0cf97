//! Core traits and types for docqa
//!
//! This crate holds the retrieval core: the error taxonomy, the chunk data
//! model, the fixed-size [`Chunker`], the exact [`FlatIndex`], and the
//! capability traits ([`Embedder`], [`Generator`]) that external providers
//! implement. Providers are injected by the caller, which keeps the pipeline
//! test-friendly.

pub mod chunker;
pub mod config;
pub mod embedder;
pub mod error;
pub mod index;
pub mod llm;
pub mod snapshot;
pub mod types;


pub use chunker::Chunker;
pub use config::RetrievalConfig;
pub use embedder::{Embedder, HashingEmbedder};
pub use error::{Error, Result, Stage};
pub use index::{FlatIndex, VectorIndex, squared_l2};
pub use llm::{GenerationConfig, GenerationResult, Generator};
pub use snapshot::{ChunkRecord, CorpusSnapshot};
pub use types::*;
