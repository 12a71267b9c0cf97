//! Vector index trait and the exact flat L2 implementation

use std::cmp::Ordering;
use std::sync::Arc;

use crate::{Chunk, EmbeddedChunk, Error, QueryResult, Result};

/// Trait for nearest-neighbour indexes over embedded chunks.
///
/// Implementations must return exact nearest neighbours by squared Euclidean
/// distance, ordered ascending with ties broken by the lower chunk id.
pub trait VectorIndex: Send + Sync {
    /// Replace the index contents.
    ///
    /// On error the previous contents stay in place.
    fn build(&mut self, embedded: Vec<EmbeddedChunk>) -> Result<()>;

    /// Return the `min(k, len)` nearest chunks to `query`.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<QueryResult>>;

    /// Stored entries in insertion order.
    fn entries(&self) -> &[EmbeddedChunk];

    /// Dimension fixed by the last successful build.
    fn dimension(&self) -> Option<usize>;

    /// Drop every entry.
    fn clear(&mut self);

    fn len(&self) -> usize {
        self.entries().len()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Brute-force exact index, O(n·d) per query.
#[derive(Debug, Default, Clone)]
pub struct FlatIndex {
    entries: Vec<EmbeddedChunk>,
    dimension: Option<usize>,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new index in one step.
    pub fn from_embedded(embedded: Vec<EmbeddedChunk>) -> Result<Self> {
        let mut index = Self::new();
        index.build(embedded)?;
        Ok(index)
    }

    /// Look up a stored chunk by id.
    pub fn chunk(&self, id: u64) -> Option<&Arc<Chunk>> {
        self.entries
            .iter()
            .map(|e| &e.chunk)
            .find(|chunk| chunk.id == id)
    }

    fn validate(embedded: &[EmbeddedChunk]) -> Result<usize> {
        let first = embedded.first().ok_or(Error::EmptyCorpus)?;
        let expected = first.dimension();
        if expected == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        if let Some(bad) = embedded.iter().find(|e| e.dimension() != expected) {
            return Err(Error::DimensionMismatch {
                expected,
                actual: bad.dimension(),
            });
        }

        if let Some(bad) = embedded.iter().find(|e| !all_finite(&e.vector)) {
            return Err(Error::NonFiniteVector(format!("chunk {}", bad.chunk.id)));
        }

        Ok(expected)
    }
}

// NaN and infinite components would make distances unordered
fn all_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}

fn by_distance_then_id(a: &(f32, &EmbeddedChunk), b: &(f32, &EmbeddedChunk)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.chunk.id.cmp(&b.1.chunk.id))
}

impl VectorIndex for FlatIndex {
    fn build(&mut self, mut embedded: Vec<EmbeddedChunk>) -> Result<()> {
        let dimension = Self::validate(&embedded)?;

        // insertion order is chunk id order
        embedded.sort_by_key(|e| e.chunk.id);

        tracing::debug!(
            entries = embedded.len(),
            dimension,
            "built flat index"
        );
        self.entries = embedded;
        self.dimension = Some(dimension);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<QueryResult>> {
        if k == 0 {
            return Err(Error::InvalidConfig(
                "k must be at least 1".to_string(),
            ));
        }

        let dimension = match self.dimension {
            Some(d) if !self.entries.is_empty() => d,
            _ => return Err(Error::EmptyCorpus),
        };

        if query.len() != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if !all_finite(query) {
            return Err(Error::NonFiniteVector("query".to_string()));
        }

        let mut scored: Vec<(f32, &EmbeddedChunk)> = self
            .entries
            .iter()
            .map(|entry| (squared_l2(query, &entry.vector), entry))
            .collect();

        let take = k.min(scored.len());
        if take < scored.len() {
            scored.select_nth_unstable_by(take - 1, by_distance_then_id);
            scored.truncate(take);
        }
        scored.sort_by(by_distance_then_id);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (distance, entry))| QueryResult {
                rank,
                chunk: Arc::clone(&entry.chunk),
                distance,
            })
            .collect())
    }

    fn entries(&self) -> &[EmbeddedChunk] {
        &self.entries
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.dimension = None;
    }
}
