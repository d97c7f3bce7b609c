//! Vector store trait for storing and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{EmbeddedChunk, RetrievalMatch};
use crate::error::Result;

/// A storage backend for chunk embeddings with cosine-distance search.
///
/// Implementations manage named collections keyed by chunk id. Upserting an
/// id that already exists replaces its vector, text and metadata, which makes
/// re-running an interrupted index build safe.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1536).await?;
/// store.upsert("docs", &chunks).await?;
/// let matches = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace chunks by id. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<()>;

    /// Find the `top_k` chunks closest to `embedding`.
    ///
    /// Returns at most `top_k` matches ordered by ascending cosine distance.
    /// An empty collection yields an empty result.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>>;

    /// Number of chunks stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}
