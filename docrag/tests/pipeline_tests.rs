//! End-to-end build and query over a small on-disk corpus.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use docrag::{
    AnswerGenerator, ChatTurn, CorpusPaths, EmbeddingProvider, InMemoryVectorStore, RagConfig,
    RagError, RagPipeline, Result, SourceMeta, VectorStore, read_chunk_store,
};

const SEARCH_INDEX: &str = r#"Search.setIndex({"docnames":["404","classes/class_node","tutorials/signals","classes/class_tween"],"filenames":["404.rst","classes/class_node.rst","tutorials/signals.rst","classes/class_tween.rst"],"titles":["Page not found","Node","Using signals","Tween"],"terms":{"node":[1],"{brace}":[0]}})"#;

/// Counts a few keywords; texts sharing a keyword land close together.
struct KeywordEmbedder;

const KEYWORDS: [&str; 3] = ["node", "signal", "page"];

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS.iter().map(|k| lower.matches(k).count() as f32).collect();
        vector.push(0.1);
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len() + 1
    }
}

struct CannedGenerator;

#[async_trait]
impl AnswerGenerator for CannedGenerator {
    async fn generate(&self, _prompt: &str, _history: &[ChatTurn], context: &str) -> Result<String> {
        Ok(format!("based on {} excerpts", context.matches("[doc_id=").count()))
    }
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// A corpus with three source files; `classes/class_tween` has none.
fn corpus(root: &Path) -> RagConfig {
    let paths = CorpusPaths::new(root.join("doc"), root.join("data"));
    write(&paths.search_index_js(), SEARCH_INDEX);

    let sources = paths.source_dir();
    write(&sources.join("404.rst.txt"), "Page not found. The page you requested does not exist.");
    write(
        &sources.join("classes/class_node.rst.txt"),
        &"Node is the base class of the scene tree. A node can have any number of child nodes. \
          Use add_child to attach a node and remove_child to detach it. "
            .repeat(4),
    );
    write(
        &sources.join("tutorials/signals.rst.txt"),
        &"Signals let objects react to events. Connect a signal to a method with connect. "
            .repeat(4),
    );

    RagConfig::builder().paths(paths).max_tokens(40).overlap_tokens(10).batch_size(4).build().unwrap()
}

fn pipeline(config: RagConfig, store: Arc<dyn VectorStore>) -> RagPipeline {
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(KeywordEmbedder))
        .vector_store(store)
        .answer_generator(Arc::new(CannedGenerator))
        .build()
        .unwrap()
}

#[tokio::test]
async fn rebuild_writes_every_artifact_and_indexes_all_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let config = corpus(dir.path());
    let paths = config.paths.clone();
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline(config, store.clone());

    let report = pipeline.rebuild().await.unwrap();

    assert_eq!(report.documents, 4);
    assert_eq!(report.chunk_store.documents_chunked, 3);
    assert_eq!(report.chunk_store.missing_documents, vec!["3".to_string()]);
    assert!(report.index.skipped_batches.is_empty());
    assert_eq!(report.index.chunks_indexed, report.chunk_store.chunks_written);

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(paths.search_index_json()).unwrap()).unwrap();
    assert_eq!(parsed["titles"][1], "Node");

    let meta = SourceMeta::load(paths.source_meta_json()).unwrap();
    assert_eq!(meta.get("1").unwrap().name, "classes/class_node.rst");
    assert!(meta.get("1").unwrap().source.ends_with("class_node.rst.txt"));

    let records = read_chunk_store(paths.chunks_file()).unwrap();
    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), records.len());
    assert!(records.iter().filter(|r| r.doc_id == "1").count() > 1);
    assert_eq!(store.count("docs").await.unwrap(), records.len());
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryVectorStore::new());
    let pipeline = pipeline(corpus(dir.path()), store.clone());

    let first = pipeline.rebuild().await.unwrap();
    let second = pipeline.rebuild().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.count("docs").await.unwrap(), second.index.chunks_indexed);
}

#[tokio::test]
async fn answers_cite_the_closest_documents_first() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(corpus(dir.path()), Arc::new(InMemoryVectorStore::new()));
    pipeline.rebuild().await.unwrap();

    let retrieval = pipeline.retrieve("how do I connect a signal?", 3).await.unwrap();
    assert_eq!(retrieval.len(), 3);
    assert_eq!(retrieval.metadatas()[0].doc_id, "2");
    let distances = retrieval.distances();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));

    let answer = pipeline.answer("what is a node?", 2, &[]).await.unwrap();
    assert_eq!(answer.answer, "based on 2 excerpts");
    assert_eq!(answer.citations.len(), 2);
    assert_eq!(answer.citations[0].doc_id, "1");
    assert!(answer.citations[0].score >= answer.citations[1].score);
}

#[tokio::test]
async fn snapshot_carries_the_collection_to_a_new_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = corpus(dir.path());
    let snapshot = config.paths.vector_snapshot(&config.collection);

    let store = Arc::new(InMemoryVectorStore::new());
    pipeline(config.clone(), store.clone()).rebuild().await.unwrap();
    store.save(&snapshot).await.unwrap();

    let reloaded = Arc::new(InMemoryVectorStore::load(&snapshot).await.unwrap());
    let query_side = pipeline(config, reloaded);
    let retrieval = query_side.retrieve("page not found", 1).await.unwrap();
    assert_eq!(retrieval.metadatas()[0].doc_id, "0");
}

#[tokio::test]
async fn malformed_search_index_aborts_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = corpus(dir.path());
    std::fs::write(config.paths.search_index_js(), "var index = {};").unwrap();
    let store = Arc::new(InMemoryVectorStore::new());

    let err = pipeline(config.clone(), store.clone()).rebuild().await.unwrap_err();

    assert!(matches!(err, RagError::FormatError(_)));
    assert!(!config.paths.chunks_file().exists());
}
