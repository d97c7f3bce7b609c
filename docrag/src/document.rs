//! Data types for documents, chunks, and retrieval matches.

use serde::{Deserialize, Serialize};

/// A document of the corpus, identified by its ordinal position in the search index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDocument {
    /// Decimal string of the document's position in the index.
    pub doc_id: String,
    /// Logical document path without extension.
    pub name: String,
    /// Path of the raw text file.
    pub source: String,
}

/// Build the identifier of the `sequence`-th chunk of a document.
pub fn chunk_id(doc_id: &str, sequence: usize) -> String {
    format!("{doc_id}_{sequence}")
}

/// One line of the chunk store.
///
/// The field names are the on-disk format and must not change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    /// `{doc_id}_{sequence}`.
    pub id: String,
    /// The parent [`SourceDocument`]'s id.
    pub doc_id: String,
    /// The chunk text.
    pub text: String,
    /// Copied from the parent document.
    pub source: String,
}

impl ChunkRecord {
    /// Metadata stored alongside the chunk's vector.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata { source: self.source.clone(), doc_id: self.doc_id.clone() }
    }
}

/// Metadata attached to every vector in the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChunkMetadata {
    /// Path of the raw text file the chunk came from.
    pub source: String,
    /// The parent document id.
    pub doc_id: String,
}

/// A chunk with its vector embedding, as stored in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddedChunk {
    /// Chunk id, the collection key.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The vector embedding for this chunk's text.
    pub embedding: Vec<f32>,
    /// Source and parent document of the chunk.
    pub metadata: ChunkMetadata,
}

impl EmbeddedChunk {
    /// Attach an embedding to a stored chunk record.
    pub fn from_record(record: &ChunkRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            embedding,
            metadata: record.metadata(),
        }
    }
}

/// A stored chunk returned by a nearest-neighbour search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalMatch {
    /// Chunk id.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// Source and parent document of the chunk.
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query (lower is closer).
    pub distance: f32,
}
