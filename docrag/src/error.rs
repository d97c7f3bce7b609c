//! Error types for the `docrag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or querying the corpus.
///
/// Variants fall in two groups. [`FormatError`](RagError::FormatError),
/// [`ConfigError`](RagError::ConfigError), [`Io`](RagError::Io) and
/// [`VectorStoreError`](RagError::VectorStoreError) during indexing abort a
/// build. [`MissingFile`](RagError::MissingFile), [`ChunkingError`](RagError::ChunkingError)
/// and a per-batch [`EmbeddingError`](RagError::EmbeddingError) are captured
/// into the build reports instead.
#[derive(Debug, Error)]
pub enum RagError {
    /// A structured artifact is missing its expected shape or cannot be parsed.
    #[error("Format error: {0}")]
    FormatError(String),

    /// A source document's backing file does not exist.
    #[error("Source file not found: {}", path.display())]
    MissingFile {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while turning tokens back into chunk text.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// The answer-generation service failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The chat provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Filesystem failure while reading or writing an artifact.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization failure while writing an artifact.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl RagError {
    /// Whether the build may continue past this error at document or batch granularity.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RagError::MissingFile { .. }
                | RagError::ChunkingError(_)
                | RagError::EmbeddingError { .. }
        )
    }
}

/// A convenience result type for corpus operations.
pub type Result<T> = std::result::Result<T, RagError>;
