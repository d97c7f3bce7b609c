//! Query-time nearest-neighbour retrieval.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error};

use crate::document::{ChunkMetadata, RetrievalMatch};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// The matches for one query, closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
    matches: Vec<RetrievalMatch>,
}

impl Retrieval {
    /// Order `matches` by ascending distance and keep the first `top_k`.
    pub fn new(mut matches: Vec<RetrievalMatch>, top_k: usize) -> Self {
        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(top_k);
        Self { matches }
    }

    /// The matches, closest first.
    pub fn matches(&self) -> &[RetrievalMatch] {
        &self.matches
    }

    /// Matched chunk texts, parallel to [`metadatas`](Self::metadatas) and
    /// [`distances`](Self::distances).
    pub fn texts(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.text.as_str()).collect()
    }

    /// Metadata of each match.
    pub fn metadatas(&self) -> Vec<&ChunkMetadata> {
        self.matches.iter().map(|m| &m.metadata).collect()
    }

    /// Distance of each match.
    pub fn distances(&self) -> Vec<f32> {
        self.matches.iter().map(|m| m.distance).collect()
    }

    /// Number of matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Take ownership of the matches.
    pub fn into_matches(self) -> Vec<RetrievalMatch> {
        self.matches
    }
}

/// Embeds a query and searches one collection for its nearest chunks.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
}

impl Retriever {
    /// Create a retriever over `collection`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self { embedding_provider, vector_store, collection: collection.into() }
    }

    /// The searched collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Return up to `top_k` chunks closest to `query`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` is zero, and propagates
    /// the embedding or vector store error if either call fails.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Retrieval> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let matches = self
            .vector_store
            .search(&self.collection, &query_embedding, top_k)
            .await
            .map_err(|e| {
                error!(collection = %self.collection, error = %e, "vector store search failed");
                e
            })?;

        let retrieval = Retrieval::new(matches, top_k);
        debug!(collection = %self.collection, top_k, matches = retrieval.len(), "retrieved");
        Ok(retrieval)
    }
}
