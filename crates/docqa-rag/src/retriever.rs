//! Retriever: chunk, embed, index, and serve top-K lookups

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::timeout;

use docqa_core::{
    Chunk, Chunker, CorpusSnapshot, EmbeddedChunk, Embedder, Error, FlatIndex, QueryResult,
    Result, RetrievalConfig, Stage, VectorIndex,
};

const INGEST: Stage = "ingest";
const QUERY: Stage = "query";

/// Summary of a successful ingest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Glues the chunker to a vector index through an injected embedder
///
/// The index sits behind a read-write lock. Queries take the read lock;
/// ingestion builds a fresh index off to the side and only takes the write
/// lock to swap it in, so a failed ingest never touches the committed corpus.
pub struct Retriever<E: Embedder, I: VectorIndex = FlatIndex> {
    embedder: Arc<E>,
    chunker: Chunker,
    config: RetrievalConfig,
    index: RwLock<I>,
}

impl<E: Embedder> Retriever<E, FlatIndex> {
    /// Create a retriever backed by the exact flat index
    pub fn new(embedder: Arc<E>, config: RetrievalConfig) -> Result<Self> {
        Self::with_index(embedder, config, FlatIndex::new())
    }
}

impl<E: Embedder, I: VectorIndex + Default> Retriever<E, I> {
    /// Create a retriever around a caller-supplied index
    pub fn with_index(embedder: Arc<E>, config: RetrievalConfig, index: I) -> Result<Self> {
        config.validate()?;
        let chunker = config.chunker()?;

        Ok(Self {
            embedder,
            chunker,
            config,
            index: RwLock::new(index),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// Chunk, embed and index `documents`, replacing the current corpus
    ///
    /// Chunk ids run continuously across documents. Documents are embedded
    /// concurrently; the new index is committed only if every chunk was
    /// embedded.
    pub async fn ingest(&self, documents: &[String]) -> Result<IngestReport> {
        let mut next_id = 0u64;
        let per_document: Vec<Vec<Chunk>> = documents
            .iter()
            .map(|text| {
                let chunks = self.chunker.chunk_from(text, next_id);
                next_id += chunks.len() as u64;
                chunks
            })
            .collect();

        let chunk_count: usize = per_document.iter().map(Vec::len).sum();
        if chunk_count == 0 {
            return Err(Error::EmptyCorpus);
        }

        tracing::info!(
            documents = documents.len(),
            chunks = chunk_count,
            model = self.embedder.model_id(),
            "ingesting corpus"
        );

        let embedded: Vec<EmbeddedChunk> = try_join_all(
            per_document
                .into_iter()
                .filter(|chunks| !chunks.is_empty())
                .map(|chunks| self.embed_chunks(chunks)),
        )
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "ingest aborted, keeping previous corpus"))?
        .into_iter()
        .flatten()
        .collect();

        let mut fresh = I::default();
        fresh.build(embedded)?;
        let dimension = fresh.dimension().unwrap_or_default();

        *self.write_index() = fresh;

        Ok(IngestReport {
            documents: documents.len(),
            chunks: chunk_count,
            dimension,
        })
    }

    /// Return the `k` chunks closest to `query`, nearest first
    pub async fn retrieve_top_k(&self, query: &str, k: usize) -> Result<Vec<Arc<Chunk>>> {
        Ok(self
            .retrieve_scored(query, k)
            .await?
            .into_iter()
            .map(|result| result.chunk)
            .collect())
    }

    /// Like [`Retriever::retrieve_top_k`] but keeps rank and distance
    pub async fn retrieve_scored(&self, query: &str, k: usize) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".to_string()));
        }
        if self.read_index().is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let vector = self.with_timeout(QUERY, self.embedder.embed(query)).await?;
        let results = self.read_index().search(&vector, k)?;

        tracing::debug!(
            k,
            hits = results.len(),
            best = results.first().map(|r| r.distance),
            "retrieved chunks"
        );
        Ok(results)
    }

    /// Snapshot of the committed corpus for inspection
    pub fn snapshot(&self) -> CorpusSnapshot {
        let index = self.read_index();
        CorpusSnapshot::new(
            self.chunker.chunk_size(),
            self.chunker.overlap(),
            index.entries().iter().map(|e| e.chunk.as_ref()),
        )
    }

    /// Drop the committed corpus
    pub fn clear(&self) {
        self.write_index().clear();
    }

    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Check if a corpus has been ingested
    pub fn is_ready(&self) -> bool {
        !self.is_empty()
    }

    /// Get statistics about the retriever
    pub fn stats(&self) -> serde_json::Value {
        let index = self.read_index();
        json!({
            "ready": !index.is_empty(),
            "chunks": index.len(),
            "dimension": index.dimension(),
            "embedding_model": self.embedder.model_id(),
            "chunk_size": self.chunker.chunk_size(),
            "chunk_overlap": self.chunker.overlap(),
        })
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<EmbeddedChunk>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .with_timeout(INGEST, self.embedder.embed_batch(&texts))
            .await?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(
                INGEST,
                format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            ));
        }

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector))
            .collect())
    }

    async fn with_timeout<T>(
        &self,
        stage: Stage,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit: Duration = self.config.embed_timeout;
        match timeout(limit, call).await {
            Ok(result) => result.map_err(|e| e.into_embedding_failure(stage)),
            Err(_) => Err(Error::embedding(
                stage,
                format!("embedder timed out after {}s", limit.as_secs_f32()),
            )),
        }
    }

    fn read_index(&self) -> RwLockReadGuard<'_, I> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, I> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps each text to a vector derived from its characters; optionally
    /// fails on the n-th call to `embed`.
    struct MockEmbedder {
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        delay: Option<Duration>,
        dimension: usize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on_call: None,
                delay: None,
                dimension: 3,
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::new()
            }
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            let sum: u32 = text.chars().map(|c| c as u32).sum();
            let first = text.chars().next().map(|c| c as u32).unwrap_or(0);
            let mut v = vec![sum as f32, first as f32, text.len() as f32];
            v.resize(self.dimension, 0.0);
            v
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_id(&self) -> &str {
            "mock"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on_call == Some(call) {
                return Err(Error::Provider("simulated outage".to_string()));
            }
            Ok(self.vector_for(text))
        }
    }

    fn config(chunk_size: usize, chunk_overlap: usize) -> RetrievalConfig {
        RetrievalConfig {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_two_document_corpus() {
        let embedder = Arc::new(MockEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), config(4, 1)).unwrap();

        let report = retriever
            .ingest(&docs(&["abcdefghij", "klmnopq"]))
            .await
            .unwrap();
        assert_eq!(
            report,
            IngestReport {
                documents: 2,
                chunks: 5,
                dimension: 3
            }
        );
        assert_eq!(retriever.len(), 5);

        let snapshot = retriever.snapshot();
        let ids: Vec<u64> = snapshot.chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(snapshot.chunks[3].text, "klmn");

        // the query text embeds to exactly chunk 3's vector
        let results = retriever.retrieve_scored("klmn", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, 3);
        assert_eq!(results[0].distance, 0.0);

        let chunks = retriever.retrieve_top_k("klmn", 2).await.unwrap();
        assert_eq!(chunks[0].text, "klmn");
    }

    #[tokio::test]
    async fn test_failed_ingest_keeps_empty_index() {
        // 5 chunks in one document, embedder fails on the 2nd
        let embedder = Arc::new(MockEmbedder::failing_on(2));
        let retriever = Retriever::new(embedder, config(4, 0)).unwrap();

        let err = retriever
            .ingest(&docs(&["aaaabbbbccccddddeeee"]))
            .await
            .unwrap_err();

        match err {
            Error::EmbeddingFailure { stage, reason } => {
                assert_eq!(stage, "ingest");
                assert!(reason.contains("simulated outage"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(retriever.is_empty());
        assert!(matches!(
            retriever.retrieve_top_k("aaaa", 1).await,
            Err(Error::EmptyCorpus)
        ));
    }

    #[tokio::test]
    async fn test_failed_ingest_keeps_previous_corpus() {
        let embedder = Arc::new(MockEmbedder::failing_on(4));
        let retriever = Retriever::new(embedder, config(4, 0)).unwrap();

        // calls 1..=3 succeed
        retriever.ingest(&docs(&["old corpus!!"])).await.unwrap();
        assert_eq!(retriever.len(), 3);

        let err = retriever
            .ingest(&docs(&["aaaabbbbccccddddeeee"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingFailure { .. }));

        let texts: Vec<String> = retriever
            .snapshot()
            .chunks
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["old ", "corp", "us!!"]);
    }

    #[tokio::test]
    async fn test_ingest_replaces_corpus() {
        let retriever = Retriever::new(Arc::new(MockEmbedder::new()), config(4, 0)).unwrap();
        retriever.ingest(&docs(&["first corpus"])).await.unwrap();
        retriever.ingest(&docs(&["second"])).await.unwrap();

        let texts: Vec<String> = retriever
            .snapshot()
            .chunks
            .into_iter()
            .map(|c| c.text)
            .collect();
        assert_eq!(texts, vec!["seco", "nd"]);
    }

    #[tokio::test]
    async fn test_empty_documents() {
        let embedder = Arc::new(MockEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), config(4, 1)).unwrap();

        assert!(matches!(retriever.ingest(&[]).await, Err(Error::EmptyCorpus)));
        assert!(matches!(
            retriever.ingest(&docs(&["", ""])).await,
            Err(Error::EmptyCorpus)
        ));

        // empty documents alongside real ones are skipped
        let report = retriever.ingest(&docs(&["", "abcd", ""])).await.unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.documents, 3);
    }

    #[tokio::test]
    async fn test_query_against_empty_corpus_skips_embedder() {
        let embedder = Arc::new(MockEmbedder::new());
        let retriever = Retriever::new(embedder.clone(), RetrievalConfig::default()).unwrap();

        assert!(matches!(
            retriever.retrieve_top_k("anything", 3).await,
            Err(Error::EmptyCorpus)
        ));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert!(!retriever.is_ready());
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_attributed_to_query() {
        // 1 chunk ingested on call 1, query fails on call 2
        let embedder = Arc::new(MockEmbedder::failing_on(2));
        let retriever = Retriever::new(embedder, config(10, 0)).unwrap();
        retriever.ingest(&docs(&["short"])).await.unwrap();

        match retriever.retrieve_top_k("short", 1).await {
            Err(Error::EmbeddingFailure { stage, .. }) => assert_eq!(stage, "query"),
            other => panic!("unexpected result: {other:?}"),
        }
        // still serving afterwards
        assert_eq!(retriever.retrieve_top_k("short", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embedder_timeout_is_embedding_failure() {
        let embedder = Arc::new(MockEmbedder {
            delay: Some(Duration::from_millis(200)),
            ..MockEmbedder::new()
        });
        let retriever = Retriever::new(
            embedder,
            RetrievalConfig {
                embed_timeout: Duration::from_millis(20),
                ..config(4, 0)
            },
        )
        .unwrap();

        match retriever.ingest(&docs(&["abcdefgh"])).await {
            Err(Error::EmbeddingFailure { stage, reason }) => {
                assert_eq!(stage, "ingest");
                assert!(reason.contains("timed out"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(retriever.is_empty());
    }

    #[tokio::test]
    async fn test_query_dimension_mismatch_propagates() {
        struct ShiftingEmbedder {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl Embedder for ShiftingEmbedder {
            fn model_id(&self) -> &str {
                "shifting"
            }

            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![0.0; 2 + call])
            }
        }

        let retriever = Retriever::new(
            Arc::new(ShiftingEmbedder {
                calls: AtomicUsize::new(0),
            }),
            config(10, 0),
        )
        .unwrap();
        retriever.ingest(&docs(&["one"])).await.unwrap();

        assert!(matches!(
            retriever.retrieve_top_k("two", 1).await,
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_and_k() {
        let embedder = Arc::new(MockEmbedder::new());
        assert!(matches!(
            Retriever::new(embedder.clone(), config(5, 5)),
            Err(Error::InvalidConfig(_))
        ));

        let retriever = Retriever::new(embedder, config(4, 1)).unwrap();
        retriever.ingest(&docs(&["abcd"])).await.unwrap();
        assert!(matches!(
            retriever.retrieve_top_k("abcd", 0).await,
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_and_stats() {
        let retriever = Retriever::new(Arc::new(MockEmbedder::new()), config(4, 1)).unwrap();
        retriever.ingest(&docs(&["abcdefghij"])).await.unwrap();

        let stats = retriever.stats();
        assert_eq!(stats["chunks"], 3);
        assert_eq!(stats["dimension"], 3);
        assert_eq!(stats["embedding_model"], "mock");

        retriever.clear();
        assert!(retriever.is_empty());
        assert_eq!(retriever.stats()["ready"], false);
    }
}
