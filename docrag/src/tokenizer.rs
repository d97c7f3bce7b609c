//! Token encoding used to size chunks.

use tiktoken_rs::CoreBPE;

use crate::error::{RagError, Result};

/// Converts between text and model tokens.
///
/// Chunk sizes are measured in the units this trait produces, so the chunker
/// should use the same vocabulary as the embedding model it feeds.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token ids. Special-token markers are treated as plain text.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode token ids back into text.
    ///
    /// Fails when the tokens end or start inside a multi-byte UTF-8 sequence.
    fn decode(&self, tokens: &[u32]) -> Result<String>;
}

/// The `cl100k_base` byte-pair encoding used by OpenAI embedding models.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Load the encoding tables.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the bundled tables fail to load.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| RagError::ConfigError(format!("failed to load cl100k_base: {e}")))?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for Cl100kTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cl100kTokenizer")
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text).into_iter().map(|token| token as u32).collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.bpe
            .decode(tokens.iter().map(|&token| token as _).collect())
            .map_err(|e| RagError::ChunkingError(format!("cl100k_base decode failed: {e}")))
    }
}
