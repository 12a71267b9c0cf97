//! Embedder trait and an offline hashing embedder

use async_trait::async_trait;

use crate::{Error, Result};

/// Trait for embedding providers (e.g., Gemini, local models, etc.)
///
/// Implementations must be deterministic for identical input within a
/// session and return vectors of one fixed dimension. `embed` and
/// `embed_batch` may use different embedding spaces (Gemini embeds queries
/// and documents with different task types), so a text embedded alone need
/// not land at distance zero from its batch vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Get the model ID being used
    fn model_id(&self) -> &str;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one vector per text in the same order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Default dimension of [`HashingEmbedder`] vectors.
pub const DEFAULT_HASHING_DIMENSION: usize = 384;

/// Feature-hashing embedder that needs no model or network.
///
/// Each lowercase alphanumeric token is hashed with MD5 into a bucket and a
/// sign; the resulting bag-of-words vector is L2-normalized. Texts that share
/// words land close together, which is enough for offline use and tests.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidConfig(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self::with_dimension(dimension))
    }

    fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: format!("hashing-md5-{}", dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = md5::compute(token.to_lowercase().as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]);
            let idx = (bucket % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::with_dimension(DEFAULT_HASHING_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}
