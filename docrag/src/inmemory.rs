//! In-memory vector store using cosine distance.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It can be saved to and
//! loaded from a JSON snapshot, which is how an offline build hands its
//! collection to the query side without an external database.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{EmbeddedChunk, RetrievalMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine distance for search.
///
/// Collections are stored as nested `HashMap`s: collection name → chunk ID → chunk.
/// All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::load("data/VectorDB/docs.json").await?;
/// store.create_collection("docs", 1536).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, EmbeddedChunk>>>,
}

/// On-disk form: collections and their chunks in sorted order.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    collections: BTreeMap<String, Vec<EmbeddedChunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot written by [`save`](Self::save).
    ///
    /// A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FormatError`] if the snapshot cannot be parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no vector snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
            RagError::FormatError(format!("invalid vector snapshot {}: {e}", path.display()))
        })?;
        let collections = snapshot
            .collections
            .into_iter()
            .map(|(name, chunks)| {
                (name, chunks.into_iter().map(|chunk| (chunk.id.clone(), chunk)).collect())
            })
            .collect();

        Ok(Self { collections: RwLock::new(collections) })
    }

    /// Write every collection to `path`, replacing it atomically.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = {
            let collections = self.collections.read().await;
            let collections = collections
                .iter()
                .map(|(name, store)| {
                    let mut chunks: Vec<EmbeddedChunk> = store.values().cloned().collect();
                    chunks.sort_by(|a, b| a.id.cmp(&b.id));
                    (name.clone(), chunks)
                })
                .collect();
            Snapshot { collections }
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, serde_json::to_vec(&snapshot)?).await?;
        tokio::fs::rename(&staging, path).await?;

        info!(path = %path.display(), collections = snapshot.collections.len(), "saved vector snapshot");
        Ok(())
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStoreError {
            backend: BACKEND.to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

/// Compute cosine distance `1 - cos(a, b)` between two vectors.
///
/// Returns 1.0 if either vector has zero magnitude.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievalMatch>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let mut matches: Vec<RetrievalMatch> = store
            .values()
            .map(|chunk| RetrievalMatch {
                id: chunk.id.clone(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                distance: cosine_distance(&chunk.embedding, embedding),
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(HashMap::len).ok_or_else(|| Self::missing(collection))
    }
}
