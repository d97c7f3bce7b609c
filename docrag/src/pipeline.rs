//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the offline build (search index → source mapping
//! → chunk store → vector collection) and the online query path (retrieve →
//! context → answer → citations) over one [`RagConfig`], composing an
//! [`EmbeddingProvider`], a [`VectorStore`], a [`Tokenizer`] and an optional
//! [`AnswerGenerator`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .answer_generator(Arc::new(my_chat_model))
//!     .build()?;
//!
//! let report = pipeline.rebuild().await?;
//! let answer = pipeline.answer("How do I add a child node?", 5, &[]).await?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::answer::{AnswerGenerator, ChatTurn, RagAnswer};
use crate::chunk_store::{ChunkStoreReport, ChunkStoreWriter};
use crate::chunking::TokenChunker;
use crate::config::RagConfig;
use crate::context::{build_citations, build_context};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index_parser::parse_search_index_file;
use crate::indexer::{EmbeddingIndexer, IndexReport};
use crate::retriever::{Retrieval, Retriever};
use crate::source_meta::SourceMeta;
use crate::tokenizer::{Cl100kTokenizer, Tokenizer};
use crate::vectorstore::VectorStore;

/// Outcome of a full offline build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Documents listed in the search index.
    pub documents: usize,
    /// Chunk store stage summary.
    pub chunk_store: ChunkStoreReport,
    /// Indexing stage summary.
    pub index: IndexReport,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    tokenizer: Arc<dyn Tokenizer>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
    collection_ready: AtomicBool,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the vector store.
    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Delete the configured collection from the vector store.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the vector store operation fails.
    pub async fn delete_collection(&self) -> Result<()> {
        let name = &self.config.collection;
        self.vector_store.delete_collection(name).await.map_err(|e| {
            error!(collection = %name, error = %e, "failed to delete collection");
            RagError::PipelineError(format!("failed to delete collection '{name}': {e}"))
        })?;
        self.collection_ready.store(false, Ordering::Release);
        Ok(())
    }

    /// Run the text stages of the build: parse the search index, write the
    /// source mapping and rewrite the chunk store.
    ///
    /// Documents whose source file is missing or cannot be chunked are
    /// skipped and listed in the returned report.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FormatError`] if the search index or its
    /// `filenames` list is malformed, and [`RagError::Io`] on filesystem
    /// failures.
    pub fn prepare_chunks(&self) -> Result<(SourceMeta, ChunkStoreReport)> {
        prepare_chunks(&self.config, self.tokenizer.clone())
    }

    /// Run the full offline build and index the chunk store into the
    /// configured collection.
    ///
    /// Safe to re-run: the chunk store is rewritten and vectors are upserted
    /// by chunk id. The file and tokenization work of
    /// [`prepare_chunks`](Self::prepare_chunks) runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Fatal errors from [`prepare_chunks`](Self::prepare_chunks), and
    /// [`RagError::VectorStoreError`] if the collection cannot be created or
    /// written. Missing files, chunking failures and failed embedding batches
    /// are reported, not returned.
    pub async fn rebuild(&self) -> Result<BuildReport> {
        let config = self.config.clone();
        let tokenizer = self.tokenizer.clone();
        let (meta, chunk_store) =
            tokio::task::spawn_blocking(move || prepare_chunks(&config, tokenizer))
                .await
                .map_err(|e| RagError::PipelineError(format!("chunking task failed: {e}")))??;

        let indexer = EmbeddingIndexer::new(
            self.embedding_provider.clone(),
            self.vector_store.clone(),
            self.config.collection.clone(),
            self.config.batch_size,
        )?;
        let index = indexer.index_store(self.config.paths.chunks_file()).await?;
        self.collection_ready.store(true, Ordering::Release);

        let report = BuildReport { documents: meta.len(), chunk_store, index };
        if report.chunk_store.documents_skipped() > 0 || !report.index.skipped_batches.is_empty() {
            warn!(
                missing = report.chunk_store.missing_documents.len(),
                failed = report.chunk_store.failed_documents.len(),
                skipped_batches = report.index.skipped_batches.len(),
                "build finished with skipped work"
            );
        }
        info!(
            documents = report.documents,
            chunks = report.chunk_store.chunks_written,
            indexed = report.index.chunks_indexed,
            "build finished"
        );
        Ok(report)
    }

    /// Create the configured collection unless it is known to exist, so
    /// queries against a store that was never built (or was deleted) see an
    /// empty collection rather than an error.
    async fn ensure_collection(&self) -> Result<()> {
        if self.collection_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.vector_store
            .create_collection(&self.config.collection, self.embedding_provider.dimensions())
            .await?;
        self.collection_ready.store(true, Ordering::Release);
        Ok(())
    }

    fn retriever(&self) -> Retriever {
        Retriever::new(
            self.embedding_provider.clone(),
            self.vector_store.clone(),
            self.config.collection.clone(),
        )
    }

    /// Retrieve up to `top_k` chunks for `query`, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` is zero and propagates
    /// embedding and vector store failures.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Retrieval> {
        self.ensure_collection().await?;
        self.retriever().retrieve(query, top_k).await
    }

    /// Answer `query` from the corpus.
    ///
    /// Retrieves context, asks the answer generator with the conversation
    /// `history`, and returns the answer with one citation per retrieved
    /// chunk. Any failure yields an error and no partial answer.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if no answer generator is
    /// configured, and propagates retrieval and generation failures.
    pub async fn answer(&self, query: &str, top_k: usize, history: &[ChatTurn]) -> Result<RagAnswer> {
        let generator = self.answer_generator.as_ref().ok_or_else(|| {
            RagError::ConfigError("answer_generator is required to answer questions".to_string())
        })?;

        let retrieval = self.retrieve(query, top_k).await?;
        let context = build_context(retrieval.matches());

        let answer = generator.generate(query, history, &context).await.map_err(|e| {
            error!(error = %e, "answer generation failed");
            e
        })?;

        let citations = build_citations(retrieval.matches());
        info!(matches = retrieval.len(), answer_len = answer.len(), "answered query");
        Ok(RagAnswer { answer, citations })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider` and `vector_store` are required. The
/// tokenizer defaults to cl100k_base; the answer generator is only needed by
/// [`RagPipeline::answer`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .config(RagConfig::default())
///     .embedding_provider(Arc::new(embedder))
///     .vector_store(Arc::new(store))
///     .answer_generator(Arc::new(generator))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    tokenizer: Option<Arc<dyn Tokenizer>>,
    answer_generator: Option<Arc<dyn AnswerGenerator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Override the tokenizer used for chunking.
    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Set the chat model used by [`RagPipeline::answer`].
    pub fn answer_generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.answer_generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing,
    /// the configuration is invalid, or the default tokenizer cannot load.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::ConfigError("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::ConfigError("vector_store is required".to_string()))?;
        let tokenizer = match self.tokenizer {
            Some(tokenizer) => tokenizer,
            None => Arc::new(Cl100kTokenizer::new()?),
        };

        Ok(RagPipeline {
            config,
            embedding_provider,
            vector_store,
            tokenizer,
            answer_generator: self.answer_generator,
            collection_ready: AtomicBool::new(false),
        })
    }
}

/// Blocking text stages of the build: search index, source mapping, chunk
/// store.
fn prepare_chunks(
    config: &RagConfig,
    tokenizer: Arc<dyn Tokenizer>,
) -> Result<(SourceMeta, ChunkStoreReport)> {
    let paths = &config.paths;
    paths.ensure_dirs()?;

    let index = parse_search_index_file(paths.search_index_js(), paths.search_index_json())
        .map_err(|e| {
            error!(path = %paths.search_index_js().display(), error = %e, "search index rejected");
            e
        })?;
    let filenames = index.filenames()?;

    let meta = SourceMeta::from_filenames(&filenames, &paths.source_dir(), &config.source_extension);
    meta.save(paths.source_meta_json())?;

    let chunker = TokenChunker::new(tokenizer, config.max_tokens, config.overlap_tokens)?;
    let report = ChunkStoreWriter::new(paths.chunks_file(), chunker).write_all(&meta)?;
    Ok((meta, report))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::document::{ChunkMetadata, EmbeddedChunk};
    use crate::inmemory::InMemoryVectorStore;

    struct AxisEmbedder;

    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(if text.contains("node") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// Records the context it was given and echoes a canned answer.
    #[derive(Default)]
    struct RecordingGenerator {
        seen: Mutex<Vec<(String, usize, String)>>,
    }

    #[async_trait]
    impl AnswerGenerator for RecordingGenerator {
        async fn generate(&self, prompt: &str, history: &[ChatTurn], context: &str) -> Result<String> {
            self.seen.lock().unwrap().push((prompt.to_string(), history.len(), context.to_string()));
            Ok("Use add_child().".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl AnswerGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _history: &[ChatTurn], _context: &str) -> Result<String> {
            Err(RagError::GenerationError { provider: "mock".into(), message: "timeout".into() })
        }
    }

    fn chunk(id: &str, doc_id: &str, text: &str, embedding: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            id: id.to_string(),
            text: text.to_string(),
            embedding,
            metadata: ChunkMetadata { source: format!("doc/_sources/{doc_id}.txt"), doc_id: doc_id.to_string() },
        }
    }

    async fn seeded_store() -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[
                    chunk("4_0", "4", "add_child adds a node", vec![1.0, 0.0]),
                    chunk("9_0", "9", "signals connect objects", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn answer_passes_context_and_returns_citations() {
        let generator = Arc::new(RecordingGenerator::default());
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(seeded_store().await)
            .answer_generator(generator.clone())
            .build()
            .unwrap();

        let history = [ChatTurn::user("hi"), ChatTurn::assistant("hello")];
        let answer = pipeline.answer("how do I add a node?", 1, &history).await.unwrap();

        assert_eq!(answer.answer, "Use add_child().");
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].doc_id, "4");
        assert_eq!(answer.citations[0].score, 1.0);

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].0, "how do I add a node?");
        assert_eq!(seen[0].1, 2);
        assert_eq!(seen[0].2, "[doc_id=4] source: doc/_sources/4.txt\nadd_child adds a node");
    }

    #[tokio::test]
    async fn query_against_unbuilt_store_is_empty() {
        let generator = Arc::new(RecordingGenerator::default());
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .answer_generator(generator.clone())
            .build()
            .unwrap();

        assert!(pipeline.retrieve("node", 5).await.unwrap().is_empty());

        let answer = pipeline.answer("node", 5, &[]).await.unwrap();
        assert!(answer.citations.is_empty());
        assert_eq!(generator.seen.lock().unwrap()[0].2, "");
    }

    #[tokio::test]
    async fn query_after_delete_collection_is_empty() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(seeded_store().await)
            .build()
            .unwrap();
        assert_eq!(pipeline.retrieve("node", 5).await.unwrap().len(), 2);

        pipeline.delete_collection().await.unwrap();

        assert!(pipeline.retrieve("node", 5).await.unwrap().is_empty());
        assert_eq!(pipeline.vector_store().count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn generation_failure_yields_no_answer() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(seeded_store().await)
            .answer_generator(Arc::new(FailingGenerator))
            .build()
            .unwrap();

        let err = pipeline.answer("node", 5, &[]).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationError { .. }));
    }

    #[tokio::test]
    async fn answer_requires_a_generator() {
        let pipeline = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(seeded_store().await)
            .build()
            .unwrap();

        assert!(matches!(pipeline.answer("node", 5, &[]).await, Err(RagError::ConfigError(_))));
    }

    #[test]
    fn builder_requires_collaborators() {
        let missing_store = RagPipeline::builder()
            .config(RagConfig::default())
            .embedding_provider(Arc::new(AxisEmbedder))
            .build();
        assert!(matches!(missing_store, Err(RagError::ConfigError(_))));

        let bad_config = RagConfig { overlap_tokens: 600, ..RagConfig::default() };
        let invalid = RagPipeline::builder()
            .config(bad_config)
            .embedding_provider(Arc::new(AxisEmbedder))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build();
        assert!(matches!(invalid, Err(RagError::ConfigError(_))));
    }
}
