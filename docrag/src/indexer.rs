//! Batch embedding of the chunk store into a vector collection.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::chunk_store::read_chunk_store;
use crate::document::{ChunkRecord, EmbeddedChunk};
use crate::embedding::{EmbeddingProvider, check_batch_len};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Batches the records were split into.
    pub batches_total: usize,
    /// Batches embedded and upserted.
    pub batches_indexed: usize,
    /// Zero-based indices of batches whose embedding request failed.
    pub skipped_batches: Vec<usize>,
    /// Chunks written to the collection.
    pub chunks_indexed: usize,
    /// Chunks left out because their batch failed.
    pub chunks_skipped: usize,
}

/// Embeds chunk records batch by batch and upserts them into a collection.
///
/// A failed embedding request skips its batch and the run moves on; upsert
/// semantics make a later rerun safe for the batches that already succeeded.
/// Batches are not retried within a run.
pub struct EmbeddingIndexer {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
}

impl EmbeddingIndexer {
    /// Create an indexer writing to `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `batch_size` is zero.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(RagError::ConfigError("batch_size must be greater than zero".to_string()));
        }
        Ok(Self { embedding_provider, vector_store, collection: collection.into(), batch_size })
    }

    /// Read the chunk store at `path` and index every record.
    ///
    /// # Errors
    ///
    /// See [`read_chunk_store`] and [`index`](Self::index).
    pub async fn index_store(&self, path: impl AsRef<Path>) -> Result<IndexReport> {
        let records = read_chunk_store(path)?;
        self.index(&records).await
    }

    /// Embed and upsert `records` in batches of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStoreError`] if the collection cannot be
    /// created or an upsert fails. A failed embedding request skips its batch;
    /// any other error from the provider aborts the run.
    pub async fn index(&self, records: &[ChunkRecord]) -> Result<IndexReport> {
        self.vector_store
            .create_collection(&self.collection, self.embedding_provider.dimensions())
            .await?;

        let mut report = IndexReport::default();

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            report.batches_total += 1;
            let texts: Vec<&str> = batch.iter().map(|r| r.text.as_str()).collect();

            let embeddings = match self.embed(&texts).await {
                Ok(embeddings) => embeddings,
                Err(e) if e.is_recoverable() => {
                    error!(
                        batch = batch_index,
                        first_id = %batch[0].id,
                        size = batch.len(),
                        error = %e,
                        "embedding request failed, skipping batch"
                    );
                    report.skipped_batches.push(batch_index);
                    report.chunks_skipped += batch.len();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let chunks: Vec<EmbeddedChunk> = batch
                .iter()
                .zip(embeddings)
                .map(|(record, embedding)| EmbeddedChunk::from_record(record, embedding))
                .collect();

            self.vector_store.upsert(&self.collection, &chunks).await?;
            debug!(batch = batch_index, size = chunks.len(), "upserted batch");

            report.batches_indexed += 1;
            report.chunks_indexed += chunks.len();
        }

        info!(
            collection = %self.collection,
            batches = report.batches_total,
            skipped = report.skipped_batches.len(),
            chunks = report.chunks_indexed,
            "indexing finished"
        );
        Ok(report)
    }

    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embedding_provider.embed_batch(texts).await?;
        check_batch_len(self.embedding_provider.name(), texts.len(), embeddings.len())?;
        Ok(embeddings)
    }
}
