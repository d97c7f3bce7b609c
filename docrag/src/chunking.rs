//! Token-window chunking.
//!
//! [`TokenChunker`] encodes a document once and slides a window of
//! `max_tokens` over the token stream with a step of
//! `max_tokens - overlap_tokens`, decoding each window back to text. The last
//! window stops at the end of the stream and may be shorter than `max_tokens`.
//!
//! Chunk IDs are generated as `{doc_id}_{sequence}`, so rerunning the chunker
//! on identical text with identical parameters reproduces the same IDs.

use std::ops::Range;
use std::sync::Arc;

use crate::config::validate_window;
use crate::document::{ChunkRecord, SourceDocument, chunk_id};
use crate::error::Result;
use crate::tokenizer::Tokenizer;

/// Edge tokens that may be dropped to decode a window cut inside a UTF-8 sequence.
const MAX_EDGE_TRIM: usize = 3;

/// One window of a document's token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Zero-based position of the window within the document.
    pub sequence: usize,
    /// Token positions covered by the window.
    pub tokens: Range<usize>,
    /// The decoded window.
    pub text: String,
}

/// Splits text into overlapping windows measured in tokens.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use docrag::{Cl100kTokenizer, TokenChunker};
///
/// let chunker = TokenChunker::new(Arc::new(Cl100kTokenizer::new()?), 600, 150)?;
/// for chunk in chunker.chunks(&text) {
///     println!("{}", chunk?.text);
/// }
/// ```
#[derive(Clone)]
pub struct TokenChunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl std::fmt::Debug for TokenChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenChunker")
            .field("max_tokens", &self.max_tokens)
            .field("overlap_tokens", &self.overlap_tokens)
            .finish_non_exhaustive()
    }
}

impl TokenChunker {
    /// Create a new `TokenChunker`.
    ///
    /// # Arguments
    ///
    /// * `max_tokens`: maximum number of tokens per chunk
    /// * `overlap_tokens`: number of tokens shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`](crate::RagError::ConfigError) if
    /// `max_tokens` is zero or `overlap_tokens >= max_tokens`.
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        max_tokens: usize,
        overlap_tokens: usize,
    ) -> Result<Self> {
        validate_window(max_tokens, overlap_tokens)?;
        Ok(Self { tokenizer, max_tokens, overlap_tokens })
    }

    /// Maximum tokens per chunk.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Tokens shared by consecutive chunks.
    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Distance between the starts of consecutive windows. Always positive.
    pub fn step(&self) -> usize {
        self.max_tokens - self.overlap_tokens
    }

    /// Lazily produce the windows of `text`.
    ///
    /// The text is encoded up front; windows are decoded as the iterator
    /// advances. Calling `chunks` again starts a fresh pass over the same
    /// windows.
    pub fn chunks(&self, text: &str) -> TokenWindows<'_> {
        TokenWindows {
            chunker: self,
            tokens: self.tokenizer.encode(text),
            next_start: 0,
            sequence: 0,
            finished: false,
        }
    }

    /// Chunk one document into store records.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`](crate::RagError::ChunkingError) if
    /// a window cannot be decoded.
    pub fn chunk_document(&self, document: &SourceDocument, text: &str) -> Result<Vec<ChunkRecord>> {
        self.chunks(text)
            .map(|chunk| {
                let chunk = chunk?;
                Ok(ChunkRecord {
                    id: chunk_id(&document.doc_id, chunk.sequence),
                    doc_id: document.doc_id.clone(),
                    text: chunk.text,
                    source: document.source.clone(),
                })
            })
            .collect()
    }

    /// Decode a window, dropping up to [`MAX_EDGE_TRIM`] tokens per edge if
    /// the window boundary splits a character.
    fn render(&self, window: &[u32]) -> Result<String> {
        let first_error = match self.tokenizer.decode(window) {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        for trimmed in 1..=2 * MAX_EDGE_TRIM {
            for lead in 0..=trimmed.min(MAX_EDGE_TRIM) {
                let trail = trimmed - lead;
                if trail > MAX_EDGE_TRIM || trimmed >= window.len() {
                    continue;
                }
                if let Ok(text) = self.tokenizer.decode(&window[lead..window.len() - trail]) {
                    return Ok(text);
                }
            }
        }

        Err(first_error)
    }
}

/// Iterator over the windows of one text. See [`TokenChunker::chunks`].
#[derive(Clone)]
pub struct TokenWindows<'a> {
    chunker: &'a TokenChunker,
    tokens: Vec<u32>,
    next_start: usize,
    sequence: usize,
    finished: bool,
}

impl TokenWindows<'_> {
    /// Total tokens in the encoded text.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// The encoded text.
    pub fn tokens(&self) -> &[u32] {
        &self.tokens
    }
}

impl Iterator for TokenWindows<'_> {
    type Item = Result<TextChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.next_start >= self.tokens.len() {
            return None;
        }

        let start = self.next_start;
        let end = (start + self.chunker.max_tokens).min(self.tokens.len());
        let sequence = self.sequence;

        self.sequence += 1;
        if end == self.tokens.len() {
            self.finished = true;
        } else {
            self.next_start = start + self.chunker.step();
        }

        Some(
            self.chunker
                .render(&self.tokens[start..end])
                .map(|text| TextChunk { sequence, tokens: start..end, text }),
        )
    }
}

impl std::iter::FusedIterator for TokenWindows<'_> {}
