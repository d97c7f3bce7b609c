//! Configuration for the indexing and retrieval pipelines.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default chunk size ceiling in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 600;
/// Default number of tokens shared by consecutive chunks.
pub const DEFAULT_OVERLAP_TOKENS: usize = 150;
/// Default number of chunks per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 32;
/// Default number of neighbours returned per query.
pub const DEFAULT_TOP_K: usize = 5;
/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "docs";

/// File layout of a corpus build.
///
/// Inputs live under `doc_dir` (the generated documentation site), outputs
/// under `data_dir`:
///
/// ```text
/// doc/searchindex.js           data/meta/searchindex.json
/// doc/_sources/<name>.txt      data/meta/source_meta.json
///                              data/chunks/chunks.jsonl
///                              data/VectorDB/<collection>.json
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusPaths {
    /// Root of the generated documentation.
    pub doc_dir: PathBuf,
    /// Root for every artifact the build produces.
    pub data_dir: PathBuf,
}

impl Default for CorpusPaths {
    fn default() -> Self {
        Self { doc_dir: PathBuf::from("doc"), data_dir: PathBuf::from("data") }
    }
}

impl CorpusPaths {
    /// Create a layout rooted at the given directories.
    pub fn new(doc_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self { doc_dir: doc_dir.into(), data_dir: data_dir.into() }
    }

    /// Directory holding the raw text of every document.
    pub fn source_dir(&self) -> PathBuf {
        self.doc_dir.join("_sources")
    }

    /// The generated search-index script.
    pub fn search_index_js(&self) -> PathBuf {
        self.doc_dir.join("searchindex.js")
    }

    /// Directory holding the chunk store.
    pub fn chunks_dir(&self) -> PathBuf {
        self.data_dir.join("chunks")
    }

    /// The line-oriented chunk store.
    pub fn chunks_file(&self) -> PathBuf {
        self.chunks_dir().join("chunks.jsonl")
    }

    /// Directory holding the parsed index and source mapping.
    pub fn meta_dir(&self) -> PathBuf {
        self.data_dir.join("meta")
    }

    /// Where the parsed search index is persisted.
    pub fn search_index_json(&self) -> PathBuf {
        self.meta_dir().join("searchindex.json")
    }

    /// Where the doc-id to source mapping is persisted.
    pub fn source_meta_json(&self) -> PathBuf {
        self.meta_dir().join("source_meta.json")
    }

    /// Directory holding vector store snapshots.
    pub fn vector_db_dir(&self) -> PathBuf {
        self.data_dir.join("VectorDB")
    }

    /// Snapshot file of the in-memory vector store.
    pub fn vector_snapshot(&self, collection: &str) -> PathBuf {
        self.vector_db_dir().join(format!("{collection}.json"))
    }

    /// Create every output directory. Existing directories are left alone.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.chunks_dir(), self.meta_dir(), self.vector_db_dir()] {
            std::fs::create_dir_all(&dir)?;
        }
        tracing::debug!(data_dir = %self.data_dir.display(), "output directories ready");
        Ok(())
    }
}

/// Configuration parameters for the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Input and output file layout.
    pub paths: CorpusPaths,
    /// Extension appended to an index filename to locate its raw text.
    pub source_extension: String,
    /// Name of the vector collection.
    pub collection: String,
    /// Maximum chunk size in tokens.
    pub max_tokens: usize,
    /// Number of overlapping tokens between consecutive chunks.
    pub overlap_tokens: usize,
    /// Number of chunks sent per embedding request while indexing.
    pub batch_size: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            paths: CorpusPaths::default(),
            source_extension: ".txt".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            batch_size: DEFAULT_BATCH_SIZE,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read,
    /// [`RagError::FormatError`] if it is not valid JSON for this type, and
    /// [`RagError::ConfigError`] if the values are inconsistent.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: RagConfig = serde_json::from_str(&raw).map_err(|e| {
            RagError::FormatError(format!("invalid config file {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `max_tokens == 0`
    /// - `overlap_tokens >= max_tokens` (the chunk window would never advance)
    /// - `batch_size == 0`
    /// - `top_k == 0`
    /// - `collection` is empty
    pub fn validate(&self) -> Result<()> {
        validate_window(self.max_tokens, self.overlap_tokens)?;
        if self.batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.collection.is_empty() {
            return Err(RagError::ConfigError("collection name must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Reject chunk windows whose step `max_tokens - overlap_tokens` is not positive.
pub(crate) fn validate_window(max_tokens: usize, overlap_tokens: usize) -> Result<()> {
    if max_tokens == 0 {
        return Err(RagError::ConfigError("max_tokens must be greater than zero".to_string()));
    }
    if overlap_tokens >= max_tokens {
        return Err(RagError::ConfigError(format!(
            "overlap_tokens ({overlap_tokens}) must be less than max_tokens ({max_tokens})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the input and output file layout.
    pub fn paths(mut self, paths: CorpusPaths) -> Self {
        self.config.paths = paths;
        self
    }

    /// Set the extension appended to index filenames.
    pub fn source_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.source_extension = extension.into();
        self
    }

    /// Set the vector collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the maximum chunk size in tokens.
    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.config.max_tokens = tokens;
        self
    }

    /// Set the overlap between consecutive chunks in tokens.
    pub fn overlap_tokens(mut self, tokens: usize) -> Self {
        self.config.overlap_tokens = tokens;
        self
    }

    /// Set the number of chunks per embedding request.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
