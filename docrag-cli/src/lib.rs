//! # docrag-cli
//!
//! The `docrag` command: rebuild a corpus, search it, and answer questions
//! one-shot or interactively.
//!
//! ```text
//! docrag build --doc-dir doc --data-dir data
//! docrag search "connect a signal" -k 3
//! docrag ask "How do I add a child node?"
//! docrag repl
//! ```
//!
//! Embeddings and answers come from an OpenAI-compatible API configured with
//! `OPENAI_API_KEY` and `OPENAI_BASE_URL`. Logging follows `RUST_LOG`.

pub mod cli;
pub mod output;
pub mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docrag::openai::{OpenAIChatGenerator, OpenAIEmbeddingProvider};
use docrag::{InMemoryVectorStore, RagConfig, RagPipeline, VectorStore};
use tracing::info;

pub use cli::{Cli, Command, GlobalArgs};

/// Install the `tracing` subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Where the collection lives.
enum Backend {
    /// Local store persisted as a JSON snapshot.
    Snapshot { store: Arc<InMemoryVectorStore>, path: PathBuf },
    #[cfg(feature = "qdrant")]
    Qdrant(Arc<docrag::qdrant::QdrantVectorStore>),
}

impl Backend {
    async fn open(global: &GlobalArgs, config: &RagConfig) -> anyhow::Result<Self> {
        #[cfg(feature = "qdrant")]
        if let Some(url) = &global.qdrant_url {
            info!(%url, "using qdrant backend");
            return Ok(Self::Qdrant(Arc::new(docrag::qdrant::QdrantVectorStore::new(url)?)));
        }
        #[cfg(not(feature = "qdrant"))]
        let _ = global;

        let path = config.paths.vector_snapshot(&config.collection);
        let store = InMemoryVectorStore::load(&path)
            .await
            .with_context(|| format!("loading vector snapshot {}", path.display()))?;
        Ok(Self::Snapshot { store: Arc::new(store), path })
    }

    fn store(&self) -> Arc<dyn VectorStore> {
        match self {
            Self::Snapshot { store, .. } => store.clone(),
            #[cfg(feature = "qdrant")]
            Self::Qdrant(store) => store.clone(),
        }
    }

    /// Make a finished build visible to later processes.
    async fn persist(&self) -> anyhow::Result<()> {
        match self {
            Self::Snapshot { store, path } => store
                .save(path)
                .await
                .with_context(|| format!("saving vector snapshot {}", path.display())),
            #[cfg(feature = "qdrant")]
            Self::Qdrant(_) => Ok(()),
        }
    }
}

fn build_pipeline(
    global: &GlobalArgs,
    config: RagConfig,
    store: Arc<dyn VectorStore>,
    with_generator: bool,
) -> anyhow::Result<RagPipeline> {
    let mut embedder = OpenAIEmbeddingProvider::from_env()?;
    if let Some(model) = &global.embedding_model {
        embedder = embedder.with_model(model);
    }

    let mut builder =
        RagPipeline::builder().config(config).embedding_provider(Arc::new(embedder)).vector_store(store);

    if with_generator {
        let mut generator = OpenAIChatGenerator::from_env()?;
        if let Some(model) = &global.chat_model {
            generator = generator.with_model(model);
        }
        builder = builder.answer_generator(Arc::new(generator));
    }

    Ok(builder.build()?)
}

/// Run one parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.rag_config()?;
    let top_k = config.top_k;
    let backend = Backend::open(&cli.global, &config).await?;
    info!(collection = %config.collection, data_dir = %config.paths.data_dir.display(), "pipeline ready");
    let with_generator = matches!(cli.command, Command::Ask { .. } | Command::Repl { .. });
    let pipeline = build_pipeline(&cli.global, config, backend.store(), with_generator)?;

    match &cli.command {
        Command::Build { .. } => {
            let report = pipeline.rebuild().await.context("corpus build failed")?;
            backend.persist().await?;
            println!("{}", output::format_build_report(&report));
        }
        Command::Search { query, .. } => {
            let retrieval = pipeline.retrieve(query, top_k).await?;
            println!("{}", output::format_matches(&retrieval));
        }
        Command::Ask { question, .. } => {
            let answer = pipeline.answer(question, top_k, &[]).await?;
            println!("{}", output::format_answer(&answer));
        }
        Command::Repl { .. } => repl::run(&pipeline, top_k).await?,
    }
    Ok(())
}
