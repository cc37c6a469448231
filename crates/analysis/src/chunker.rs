//! Text chunking module
//!
//! Splits a document into overlapping fixed-size windows of whitespace
//! tokens. No case or punctuation normalisation is applied.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("chunk size must be positive")]
    ZeroChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge { chunk_size: usize, overlap: usize },
}

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in tokens
    chunk_size: usize,
    /// Tokens shared by consecutive windows
    chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::ZeroChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                chunk_size,
                overlap: chunk_overlap,
            });
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Tokens the window start advances by
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

/// A window of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Tokens re-joined with single spaces
    pub content: String,
    /// Position of this chunk, contiguous from 0
    pub index: usize,
    /// First token (inclusive)
    pub start_token: usize,
    /// Last token (exclusive)
    pub end_token: usize,
}

impl TextChunk {
    pub fn token_count(&self) -> usize {
        self.end_token - self.start_token
    }
}

/// Split text into overlapping token windows.
///
/// Windows start every `stride` tokens and stop once a window reaches the
/// final token, so for `n` tokens there are `ceil((n - overlap) / stride)`
/// chunks (at least one when `n > 0`).
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let total = tokens.len();

    if total == 0 {
        return Vec::new();
    }

    let stride = config.stride();
    let mut chunks = Vec::with_capacity(expected_chunk_count(total, config));
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(total);
        chunks.push(TextChunk {
            content: tokens[start..end].join(" "),
            index: chunks.len(),
            start_token: start,
            end_token: end,
        });

        if end == total {
            break;
        }
        start += stride;
    }

    debug!(
        tokens = total,
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        overlap = config.chunk_overlap,
        "Text chunked"
    );

    chunks
}

/// Number of chunks `chunk_text` yields for `total` tokens
pub fn expected_chunk_count(total: usize, config: &ChunkingConfig) -> usize {
    if total == 0 {
        return 0;
    }
    total
        .saturating_sub(config.chunk_overlap)
        .div_ceil(config.stride())
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.content.as_str()).collect()
    }

    #[test]
    fn test_eight_tokens_size_four_overlap_one() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let chunks = chunk_text("a b c d e f g h", &config);
        assert_eq!(contents(&chunks), vec!["a b c d", "d e f g", "g h"]);
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
        assert!(chunk_text(" \n\t ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let config = ChunkingConfig::new(10, 3).unwrap();
        let chunks = chunk_text("  Hello,   World!\nThis is\tshort. ", &config);
        assert_eq!(contents(&chunks), vec!["Hello, World! This is short."]);
        assert_eq!(chunks[0].token_count(), 5);
    }

    #[test]
    fn test_exact_fit_is_one_chunk() {
        let config = ChunkingConfig::new(4, 1).unwrap();
        let chunks = chunk_text("a b c d", &config);
        assert_eq!(contents(&chunks), vec!["a b c d"]);
    }

    #[test]
    fn test_no_normalisation() {
        let config = ChunkingConfig::new(2, 0).unwrap();
        let chunks = chunk_text("The CAT, sat.", &config);
        assert_eq!(contents(&chunks), vec!["The CAT,", "sat."]);
    }

    #[test]
    fn test_overlap_not_smaller_than_size_rejected() {
        assert_eq!(
            ChunkingConfig::new(4, 4),
            Err(ChunkingError::OverlapTooLarge { chunk_size: 4, overlap: 4 })
        );
        assert!(ChunkingConfig::new(4, 9).is_err());
        assert_eq!(ChunkingConfig::new(0, 0), Err(ChunkingError::ZeroChunkSize));
    }

    #[test]
    fn test_chunk_count_and_coverage() {
        let words: Vec<String> = (0..97).map(|i| format!("w{i}")).collect();

        for size in 1..=12 {
            for overlap in 0..size {
                let config = ChunkingConfig::new(size, overlap).unwrap();
                for n in 1..=words.len() {
                    let text = words[..n].join(" ");
                    let chunks = chunk_text(&text, &config);

                    assert_eq!(chunks.len(), expected_chunk_count(n, &config));
                    if n > overlap {
                        let formula = (n - overlap).div_ceil(size - overlap);
                        assert_eq!(chunks.len(), formula, "n={n} size={size} overlap={overlap}");
                    }

                    let last = chunks.last().unwrap();
                    assert_eq!(last.end_token, n);
                    assert!(chunks.iter().all(|c| c.token_count() <= size));
                    for pair in chunks.windows(2) {
                        assert_eq!(pair[1].start_token, pair[0].start_token + size - overlap);
                        assert_eq!(pair[1].index, pair[0].index + 1);
                    }
                }
            }
        }
    }
}
