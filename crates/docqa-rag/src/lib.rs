//! Retrieval-augmented question answering for docqa
//!
//! This crate wires the core pieces together: the [`Retriever`] chunks and
//! indexes documents through an injected embedder, the [`PromptAssembler`]
//! turns retrieved chunks into a prompt, and the [`QaEngine`] hands that
//! prompt to an injected generator.

pub mod answer;
pub mod document;
pub mod engine;
pub mod prompt;
pub mod retriever;


pub use answer::{DecisionRecord, YesNoAnswer};
pub use document::{SourceDocument, load_document, load_documents, markdown_to_text};
pub use engine::{Answer, QaEngine};
pub use prompt::{CONTEXT_SEPARATOR, PromptAssembler, PromptTemplate};
pub use retriever::{IngestReport, Retriever};

// Re-export core types for convenience
pub use docqa_core::{
    Chunk, Chunker, CorpusSnapshot, Embedder, Error, FlatIndex, Generator, HashingEmbedder,
    QueryResult, Result, RetrievalConfig, VectorIndex,
};
