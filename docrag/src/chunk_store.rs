//! The line-oriented chunk store.
//!
//! One JSON object per line with the fields `id`, `doc_id`, `text` and
//! `source`. A rebuild truncates the file and appends complete lines only, so
//! an interrupted run leaves a readable prefix.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::chunking::TokenChunker;
use crate::document::ChunkRecord;
use crate::error::{RagError, Result};
use crate::source_meta::SourceMeta;

/// Outcome of writing the chunk store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkStoreReport {
    /// Documents listed in the source mapping.
    pub documents_total: usize,
    /// Documents whose chunks were written.
    pub documents_chunked: usize,
    /// Ids of documents whose source file was absent.
    pub missing_documents: Vec<String>,
    /// Ids of documents whose text could not be chunked.
    pub failed_documents: Vec<String>,
    /// Records written.
    pub chunks_written: usize,
}

impl ChunkStoreReport {
    /// Documents that produced no records because of an error.
    pub fn documents_skipped(&self) -> usize {
        self.missing_documents.len() + self.failed_documents.len()
    }
}

/// Writes every document of a corpus to the chunk store.
#[derive(Debug, Clone)]
pub struct ChunkStoreWriter {
    path: PathBuf,
    chunker: TokenChunker,
}

impl ChunkStoreWriter {
    /// Create a writer targeting `path` that splits documents with `chunker`.
    pub fn new(path: impl Into<PathBuf>, chunker: TokenChunker) -> Self {
        Self { path: path.into(), chunker }
    }

    /// The store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the store from every document in `meta`.
    ///
    /// A missing source file, a source that is not UTF-8, or a document that
    /// cannot be chunked is logged and recorded in the report; the remaining
    /// documents are still written.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the store cannot be created or written, or
    /// if an existing source file cannot be read for any other reason.
    pub fn write_all(&self, meta: &SourceMeta) -> Result<ChunkStoreReport> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut sink = BufWriter::new(File::create(&self.path)?);
        let mut report =
            ChunkStoreReport { documents_total: meta.len(), ..ChunkStoreReport::default() };

        for document in meta.documents() {
            let records = match read_source(Path::new(&document.source))
                .and_then(|text| self.chunker.chunk_document(document, &text))
            {
                Ok(records) => records,
                Err(RagError::MissingFile { path }) => {
                    warn!(doc_id = %document.doc_id, path = %path.display(), "source file missing, skipping document");
                    report.missing_documents.push(document.doc_id.clone());
                    continue;
                }
                Err(e) if e.is_recoverable() => {
                    warn!(doc_id = %document.doc_id, error = %e, "document could not be chunked, skipping");
                    report.failed_documents.push(document.doc_id.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };

            for record in &records {
                let mut line = serde_json::to_vec(record)?;
                line.push(b'\n');
                sink.write_all(&line)?;
            }
            report.documents_chunked += 1;
            report.chunks_written += records.len();
        }

        sink.flush()?;
        info!(
            path = %self.path.display(),
            documents = report.documents_chunked,
            skipped = report.documents_skipped(),
            chunks = report.chunks_written,
            "wrote chunk store"
        );
        Ok(report)
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RagError::MissingFile { path: path.to_path_buf() },
        std::io::ErrorKind::InvalidData => {
            RagError::ChunkingError(format!("{}: source is not valid UTF-8", path.display()))
        }
        _ => RagError::Io(e),
    })
}

/// Load every record of a chunk store. Blank lines are ignored.
///
/// # Errors
///
/// Returns [`RagError::Io`] if the file cannot be read and
/// [`RagError::FormatError`] naming the line if a record does not parse.
pub fn read_chunk_store(path: impl AsRef<Path>) -> Result<Vec<ChunkRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| {
            RagError::FormatError(format!("{}:{}: invalid chunk record: {e}", path.display(), number + 1))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::tokenizer::Cl100kTokenizer;

    fn chunker(max: usize, overlap: usize) -> TokenChunker {
        TokenChunker::new(Arc::new(Cl100kTokenizer::new().unwrap()), max, overlap).unwrap()
    }

    fn corpus(dir: &Path, files: &[(&str, Option<&str>)]) -> SourceMeta {
        let source_dir = dir.join("_sources");
        let names: Vec<String> = files.iter().map(|(name, _)| name.to_string()).collect();
        for (name, body) in files {
            if let Some(body) = body {
                let path = source_dir.join(format!("{name}.txt"));
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, body).unwrap();
            }
        }
        SourceMeta::from_filenames(&names, &source_dir, ".txt")
    }

    #[test]
    fn missing_sources_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let meta = corpus(
            dir.path(),
            &[("index", Some("Welcome to the docs.")), ("gone", None), ("classes/Node", Some("Node."))],
        );
        let store = dir.path().join("chunks").join("chunks.jsonl");

        let report = ChunkStoreWriter::new(&store, chunker(32, 8)).write_all(&meta).unwrap();

        assert_eq!(report.documents_total, 3);
        assert_eq!(report.documents_chunked, 2);
        assert_eq!(report.missing_documents, vec!["1".to_string()]);
        let records = read_chunk_store(&store).unwrap();
        assert_eq!(records.len(), report.chunks_written);
        assert_eq!(records[0].id, "0_0");
        assert_eq!(records.last().unwrap().doc_id, "2");
    }

    #[test]
    fn non_utf8_source_is_recorded_and_later_documents_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let meta = corpus(dir.path(), &[("a", Some("alpha")), ("b", None), ("c", Some("gamma"))]);
        std::fs::write(dir.path().join("_sources").join("b.txt"), [0xff, 0xfe, b'x']).unwrap();
        let store = dir.path().join("chunks.jsonl");

        let report = ChunkStoreWriter::new(&store, chunker(32, 8)).write_all(&meta).unwrap();

        assert_eq!(report.documents_chunked, 2);
        assert!(report.missing_documents.is_empty());
        assert_eq!(report.failed_documents, vec!["1".to_string()]);
        let doc_ids: Vec<String> =
            read_chunk_store(&store).unwrap().into_iter().map(|r| r.doc_id).collect();
        assert_eq!(doc_ids, vec!["0".to_string(), "2".to_string()]);
    }

    #[test]
    fn rebuild_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("chunks.jsonl");
        std::fs::write(&store, "{\"stale\": true}\n").unwrap();
        let meta = corpus(dir.path(), &[("a", Some("alpha"))]);

        ChunkStoreWriter::new(&store, chunker(32, 8)).write_all(&meta).unwrap();

        let records = read_chunk_store(&store).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "alpha");
    }

    #[test]
    fn chunk_ids_are_unique_across_the_build() {
        let dir = tempfile::tempdir().unwrap();
        let long = "Signals are Godot's version of the observer pattern. ".repeat(40);
        let meta = corpus(dir.path(), &[("a", Some(long.as_str())), ("b", Some(long.as_str())), ("c", Some("short"))]);
        let store = dir.path().join("chunks.jsonl");

        ChunkStoreWriter::new(&store, chunker(20, 5)).write_all(&meta).unwrap();

        let records = read_chunk_store(&store).unwrap();
        let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert!(records.len() > 3);
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn each_record_is_one_line_with_the_stored_fields() {
        let dir = tempfile::tempdir().unwrap();
        let meta = corpus(dir.path(), &[("a", Some("line one\nline two"))]);
        let store = dir.path().join("chunks.jsonl");

        ChunkStoreWriter::new(&store, chunker(64, 8)).write_all(&meta).unwrap();

        let raw = std::fs::read_to_string(&store).unwrap();
        assert_eq!(raw.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["doc_id", "id", "source", "text"]);
    }

    #[test]
    fn malformed_line_names_its_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("chunks.jsonl");
        std::fs::write(
            &store,
            "{\"id\":\"0_0\",\"doc_id\":\"0\",\"text\":\"t\",\"source\":\"s\"}\n\nnot json\n",
        )
        .unwrap();

        let err = read_chunk_store(&store).unwrap_err();
        assert!(matches!(&err, RagError::FormatError(msg) if msg.contains(":3:")));
    }
}
