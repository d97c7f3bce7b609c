use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use docrag::{CorpusPaths, RagConfig};

/// Build, search and question a documentation corpus.
#[derive(Parser, Debug)]
#[command(name = "docrag", version, about = "Retrieval-augmented answers over a documentation corpus")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// JSON config file; flags below override its values
    #[arg(long, global = true, env = "DOCRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Generated documentation root (holds searchindex.js and _sources/)
    #[arg(long, global = true, env = "DOCRAG_DOC_DIR")]
    pub doc_dir: Option<PathBuf>,

    /// Directory for build artifacts
    #[arg(long, global = true, env = "DOCRAG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Vector collection name
    #[arg(long, global = true, env = "DOCRAG_COLLECTION")]
    pub collection: Option<String>,

    /// Embedding model served by the OpenAI-compatible endpoint
    #[arg(long, global = true, env = "DOCRAG_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    /// Chat model used to answer questions
    #[arg(long, global = true, env = "DOCRAG_CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Qdrant gRPC URL; without it the collection is a local JSON snapshot
    #[cfg(feature = "qdrant")]
    #[arg(long, global = true, env = "DOCRAG_QDRANT_URL")]
    pub qdrant_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rebuild every artifact and the vector collection from the corpus
    Build {
        /// Maximum tokens per chunk
        #[arg(long)]
        max_tokens: Option<usize>,
        /// Tokens shared by consecutive chunks
        #[arg(long)]
        overlap_tokens: Option<usize>,
        /// Chunks per embedding request
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Print the chunks closest to a query
    Search {
        query: String,
        /// Number of matches
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Answer one question with citations
    Ask {
        question: String,
        /// Number of chunks given to the model
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Answer questions interactively until `exit` or `quit`
    Repl {
        /// Number of chunks given to the model
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}

impl Cli {
    /// Resolve the pipeline configuration: file (or defaults), then flags.
    pub fn rag_config(&self) -> docrag::Result<RagConfig> {
        let mut config = match &self.global.config {
            Some(path) => RagConfig::from_file(path)?,
            None => RagConfig::default(),
        };

        if self.global.doc_dir.is_some() || self.global.data_dir.is_some() {
            config.paths = CorpusPaths::new(
                self.global.doc_dir.clone().unwrap_or(config.paths.doc_dir),
                self.global.data_dir.clone().unwrap_or(config.paths.data_dir),
            );
        }
        if let Some(collection) = &self.global.collection {
            config.collection = collection.clone();
        }

        match &self.command {
            Command::Build { max_tokens, overlap_tokens, batch_size } => {
                config.max_tokens = max_tokens.unwrap_or(config.max_tokens);
                config.overlap_tokens = overlap_tokens.unwrap_or(config.overlap_tokens);
                config.batch_size = batch_size.unwrap_or(config.batch_size);
            }
            Command::Search { top_k, .. } | Command::Ask { top_k, .. } | Command::Repl { top_k } => {
                config.top_k = top_k.unwrap_or(config.top_k);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "docrag",
            "--doc-dir",
            "site",
            "build",
            "--max-tokens",
            "300",
            "--overlap-tokens",
            "50",
        ])
        .unwrap();

        let config = cli.rag_config().unwrap();
        assert_eq!(config.paths.doc_dir, PathBuf::from("site"));
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
        assert_eq!(config.max_tokens, 300);
        assert_eq!(config.overlap_tokens, 50);
        assert_eq!(config.batch_size, docrag::config::DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn top_k_applies_to_queries() {
        let cli = Cli::try_parse_from(["docrag", "ask", "what is a node?", "-k", "3"]).unwrap();
        assert_eq!(cli.rag_config().unwrap().top_k, 3);
        assert!(matches!(cli.command, Command::Ask { ref question, .. } if question == "what is a node?"));
    }

    #[test]
    fn invalid_window_is_rejected() {
        let cli = Cli::try_parse_from(["docrag", "build", "--max-tokens", "100", "--overlap-tokens", "100"])
            .unwrap();
        assert!(matches!(cli.rag_config(), Err(docrag::RagError::ConfigError(_))));
    }

    #[test]
    fn config_file_is_the_base_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docrag.json");
        std::fs::write(&path, r#"{"collection": "godot", "top_k": 8}"#).unwrap();

        let cli = Cli::try_parse_from([
            "docrag",
            "--config",
            path.to_str().unwrap(),
            "search",
            "signals",
        ])
        .unwrap();

        let config = cli.rag_config().unwrap();
        assert_eq!(config.collection, "godot");
        assert_eq!(config.top_k, 8);
    }
}
