//! Fixed-size, overlapping text chunking
//!
//! Windows are measured in characters so multi-byte text is never split
//! inside a code point.

use serde::{Deserialize, Serialize};

use crate::{Chunk, Error, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between adjacent windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Splits document text into overlapping fixed-size chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker, rejecting settings whose stride would not advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_size <= overlap {
            return Err(Error::InvalidConfig(format!(
                "chunk size ({}) must be greater than overlap ({})",
                chunk_size, overlap
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in characters between the starts of adjacent chunks.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Chunk a single document, numbering chunks from zero.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        self.chunk_from(text, 0)
    }

    /// Chunk a document, numbering chunks from `first_id`.
    ///
    /// Chunking stops as soon as a window reaches the end of the text, so a
    /// trailing window that would only repeat the previous overlap is never
    /// emitted.
    pub fn chunk_from(&self, text: &str, first_id: u64) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // char index -> byte index, with the end of the text as a sentinel
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(byte_idx, _)| byte_idx)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(char_count / self.stride() + 1);
        let mut offset = 0;
        let mut id = first_id;

        loop {
            let end = (offset + self.chunk_size).min(char_count);
            chunks.push(Chunk {
                id,
                source_offset: offset,
                text: text[boundaries[offset]..boundaries[end]].to_string(),
            });
            id += 1;

            if end == char_count {
                break;
            }
            offset += self.stride();
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    /// Undo the overlap: first chunk whole, then each later chunk minus its
    /// leading `overlap` characters.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.text);
            } else {
                out.extend(chunk.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_fixture_chunks() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.chunk("abcdefghij");

        assert_eq!(texts(&chunks), vec!["abcd", "defg", "ghij"]);
        let offsets: Vec<usize> = chunks.iter().map(|c| c.source_offset).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_last_chunk_may_be_short() {
        let chunker = Chunker::new(4, 0).unwrap();
        let chunks = chunker.chunk("abcdefghij");
        assert_eq!(texts(&chunks), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = Chunker::new(500, 50).unwrap();
        let chunks = chunker.chunk("Hello, world!");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].source_offset, 0);
    }

    #[test]
    fn test_rejects_non_advancing_stride() {
        assert!(matches!(Chunker::new(4, 4), Err(Error::InvalidConfig(_))));
        assert!(matches!(Chunker::new(4, 9), Err(Error::InvalidConfig(_))));
        assert!(matches!(Chunker::new(0, 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_chunk_from_continues_numbering() {
        let chunker = Chunker::new(4, 1).unwrap();
        let chunks = chunker.chunk_from("abcdefg", 7);
        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn test_multibyte_text_is_split_on_characters() {
        let chunker = Chunker::new(3, 1).unwrap();
        let chunks = chunker.chunk("héllo wörld 🚀!");
        assert_eq!(chunks[0].text, "hél");
        assert_eq!(chunks[1].text, "llo");
        assert_eq!(reconstruct(&chunks, 1), "héllo wörld 🚀!");
    }

    #[test]
    fn test_reconstruction_without_loss_or_duplication() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(13);
        for (size, overlap) in [(1, 0), (2, 1), (7, 3), (10, 0), (64, 63), (500, 50), (1000, 10)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&text);
            assert_eq!(
                reconstruct(&chunks, overlap),
                text,
                "size={size} overlap={overlap}"
            );
            for chunk in &chunks {
                assert!(chunk.text.chars().count() <= size);
            }
        }
    }
}
