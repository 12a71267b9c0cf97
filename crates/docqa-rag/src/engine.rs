//! Question answering engine

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::time::timeout;

use docqa_core::{
    Embedder, Error, FlatIndex, GenerationConfig, Generator, QueryResult, Result,
    RetrievalConfig, VectorIndex,
};

use crate::answer::{DecisionRecord, YesNoAnswer};
use crate::prompt::{PromptAssembler, PromptTemplate};
use crate::retriever::{IngestReport, Retriever};

/// Generated answer together with the context it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub template: PromptTemplate,
    pub sources: Vec<QueryResult>,
    pub prompt: String,
}

impl Answer {
    /// Interpret the reply as a yes/no verdict
    pub fn yes_no(&self) -> Result<YesNoAnswer> {
        YesNoAnswer::parse(&self.text)
    }

    /// Interpret the reply as a decision record
    pub fn decision_record(&self) -> Result<DecisionRecord> {
        DecisionRecord::parse(&self.text)
    }
}

/// Retrieval-augmented question answering over an ingested corpus
pub struct QaEngine<E: Embedder, G: Generator, I: VectorIndex = FlatIndex> {
    retriever: Retriever<E, I>,
    generator: Arc<G>,
    assembler: PromptAssembler,
    generation: GenerationConfig,
}

impl<E: Embedder, G: Generator> QaEngine<E, G, FlatIndex> {
    /// Create a new engine with the flat index
    pub fn new(embedder: Arc<E>, generator: Arc<G>, config: RetrievalConfig) -> Result<Self> {
        Ok(Self::from_retriever(Retriever::new(embedder, config)?, generator))
    }
}

impl<E: Embedder, G: Generator, I: VectorIndex + Default> QaEngine<E, G, I> {
    pub fn from_retriever(retriever: Retriever<E, I>, generator: Arc<G>) -> Self {
        let generation = GenerationConfig {
            model_id: generator.model_id().to_string(),
            timeout: retriever.config().generate_timeout,
            ..Default::default()
        };

        Self {
            retriever,
            generator,
            assembler: PromptAssembler::new(),
            generation,
        }
    }

    /// Use a custom prompt assembler
    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Override sampling settings; the timeout always follows the retrieval config
    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = GenerationConfig {
            timeout: self.retriever.config().generate_timeout,
            ..generation
        };
        self
    }

    pub fn retriever(&self) -> &Retriever<E, I> {
        &self.retriever
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    /// Replace the corpus with `documents`
    pub async fn ingest(&self, documents: &[String]) -> Result<IngestReport> {
        self.retriever.ingest(documents).await
    }

    /// Answer `question` from the top-K chunks of the corpus
    pub async fn ask(&self, question: &str, template: PromptTemplate) -> Result<Answer> {
        let sources = self
            .retriever
            .retrieve_scored(question, self.retriever.config().top_k)
            .await?;

        let prompt = self
            .assembler
            .assemble(sources.iter().map(|r| r.chunk.as_ref()), question, template);

        tracing::debug!(
            template = %template,
            sources = sources.len(),
            prompt_chars = prompt.chars().count(),
            "generating answer"
        );

        let limit = self.generation.timeout;
        let generated = match timeout(
            limit,
            self.generator.generate_with_config(&prompt, &self.generation),
        )
        .await
        {
            Ok(result) => result.map_err(Error::into_generation_failure)?,
            Err(_) => {
                tracing::warn!(timeout_secs = limit.as_secs(), "generation timed out");
                return Err(Error::GenerationFailure {
                    reason: format!("generator timed out after {}s", limit.as_secs_f32()),
                });
            }
        };

        tracing::info!(
            model = %generated.model_id,
            tokens = generated.tokens_used,
            "answer generated"
        );

        Ok(Answer {
            text: generated.text.trim().to_string(),
            template,
            sources,
            prompt,
        })
    }

    /// Get statistics about the engine
    pub fn stats(&self) -> serde_json::Value {
        json!({
            "retriever": self.retriever.stats(),
            "generation_model": self.generator.model_id(),
            "domain": self.assembler.domain(),
        })
    }
}
