//! # docrag
//!
//! Retrieval-augmented question answering over a Sphinx-built documentation corpus.
//!
//! ## Overview
//!
//! The offline build turns a `searchindex.js` and its `_sources` text files into a
//! searchable vector collection:
//!
//! 1. [`parse_search_index_file`] extracts the search index JSON.
//! 2. [`SourceMeta::from_filenames`] assigns each document a stable ordinal id.
//! 3. [`ChunkStoreWriter`] splits every document into overlapping token windows
//!    with a [`TokenChunker`] and writes `chunks.jsonl`.
//! 4. [`EmbeddingIndexer`] embeds the chunks in batches and upserts them into a
//!    [`VectorStore`].
//!
//! At query time the [`Retriever`] finds the nearest chunks, [`build_context`]
//! renders them for a prompt, an [`AnswerGenerator`] answers, and
//! [`build_citations`] points back at the sources. [`RagPipeline`] wires the
//! stages together from one [`RagConfig`].
//!
//! ## Features
//!
//! - `openai`: OpenAI-compatible embedding and chat providers
//! - `qdrant`: Qdrant vector store backend
//! - `full`: everything above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{InMemoryVectorStore, RagConfig, RagPipeline};
//! use docrag::openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
//!
//! #[tokio::main]
//! async fn main() -> docrag::Result<()> {
//!     let pipeline = RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_env()?))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .answer_generator(Arc::new(OpenAIChatGenerator::from_env()?))
//!         .build()?;
//!
//!     pipeline.rebuild().await?;
//!     let answer = pipeline.answer("How do I add a child node?", 5, &[]).await?;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod chunk_store;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index_parser;
pub mod indexer;
pub mod inmemory;
pub mod pipeline;
pub mod retriever;
pub mod source_meta;
pub mod tokenizer;
pub mod tool;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use answer::{AnswerGenerator, ChatRole, ChatTurn, RagAnswer};
pub use chunk_store::{ChunkStoreReport, ChunkStoreWriter, read_chunk_store};
pub use chunking::{TextChunk, TokenChunker, TokenWindows};
pub use config::{CorpusPaths, RagConfig, RagConfigBuilder};
pub use context::{Citation, build_citations, build_context, similarity_score};
pub use document::{ChunkMetadata, ChunkRecord, EmbeddedChunk, RetrievalMatch, SourceDocument};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index_parser::{SearchIndex, parse_search_index, parse_search_index_file};
pub use indexer::{EmbeddingIndexer, IndexReport};
pub use inmemory::InMemoryVectorStore;
pub use pipeline::{BuildReport, RagPipeline, RagPipelineBuilder};
pub use retriever::{Retrieval, Retriever};
pub use source_meta::SourceMeta;
pub use tokenizer::{Cl100kTokenizer, Tokenizer};
pub use tool::RagQueryTool;
pub use vectorstore::VectorStore;
