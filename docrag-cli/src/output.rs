//! Plain-text rendering of pipeline results.

use std::fmt::Write;

use docrag::{BuildReport, Citation, RagAnswer, Retrieval, similarity_score};

const PREVIEW_CHARS: usize = 160;

/// Summary printed after `build`.
pub fn format_build_report(report: &BuildReport) -> String {
    let mut out = String::new();
    let chunks = &report.chunk_store;
    let index = &report.index;
    let _ = writeln!(out, "documents: {}", report.documents);
    let _ = writeln!(
        out,
        "chunked: {} ({} missing, {} failed), {} chunks written",
        chunks.documents_chunked,
        chunks.missing_documents.len(),
        chunks.failed_documents.len(),
        chunks.chunks_written
    );
    let _ = write!(
        out,
        "indexed: {} chunks in {}/{} batches",
        index.chunks_indexed, index.batches_indexed, index.batches_total
    );
    if !index.skipped_batches.is_empty() {
        let _ = write!(out, ", skipped batches {:?}", index.skipped_batches);
    }
    out
}

/// One line per citation: id and score, then the source path.
pub fn format_citations(citations: &[Citation]) -> String {
    if citations.is_empty() {
        return "(no sources)".to_string();
    }
    citations
        .iter()
        .map(|c| format!("- doc_id: {} | score: {}\n  {}", c.doc_id, c.score, c.source))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Answer text followed by its sources.
pub fn format_answer(answer: &RagAnswer) -> String {
    format!("{}\n\nSources:\n{}", answer.answer, format_citations(&answer.citations))
}

/// Ranked matches with a short text preview.
pub fn format_matches(retrieval: &Retrieval) -> String {
    if retrieval.is_empty() {
        return "(no matches)".to_string();
    }
    retrieval
        .matches()
        .iter()
        .enumerate()
        .map(|(rank, m)| {
            format!(
                "{}. [doc_id={}] {} (score {})\n   {}",
                rank + 1,
                m.metadata.doc_id,
                m.metadata.source,
                similarity_score(m.distance),
                preview(&m.text)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use docrag::{ChunkMetadata, ChunkStoreReport, IndexReport, RetrievalMatch};

    use super::*;

    fn citation(doc_id: &str, score: f64) -> Citation {
        Citation { doc_id: doc_id.into(), source: format!("doc/_sources/{doc_id}.txt"), score }
    }

    #[test]
    fn citations_list_id_score_and_source() {
        let text = format_citations(&[citation("3", 0.95), citation("8", 0.7)]);
        assert_eq!(
            text,
            "- doc_id: 3 | score: 0.95\n  doc/_sources/3.txt\n- doc_id: 8 | score: 0.7\n  doc/_sources/8.txt"
        );
    }

    #[test]
    fn empty_results_say_so() {
        assert_eq!(format_citations(&[]), "(no sources)");
        assert_eq!(format_matches(&Retrieval::default()), "(no matches)");
    }

    #[test]
    fn matches_are_ranked_with_previews() {
        let retrieval = Retrieval::new(
            vec![RetrievalMatch {
                id: "1_0".into(),
                text: "Node is\nthe base class".into(),
                metadata: ChunkMetadata { source: "a.txt".into(), doc_id: "1".into() },
                distance: 0.25,
            }],
            5,
        );
        assert_eq!(format_matches(&retrieval), "1. [doc_id=1] a.txt (score 0.75)\n   Node is the base class");
    }

    #[test]
    fn long_previews_are_cut_on_char_boundaries() {
        let text = "é".repeat(PREVIEW_CHARS + 10);
        let cut = preview(&text);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn build_report_mentions_skipped_batches() {
        let report = BuildReport {
            documents: 4,
            chunk_store: ChunkStoreReport {
                documents_total: 4,
                documents_chunked: 3,
                missing_documents: vec!["3".into()],
                failed_documents: vec![],
                chunks_written: 9,
            },
            index: IndexReport {
                batches_total: 3,
                batches_indexed: 2,
                skipped_batches: vec![1],
                chunks_indexed: 6,
                chunks_skipped: 3,
            },
        };
        let text = format_build_report(&report);
        assert!(text.contains("3 (1 missing, 0 failed), 9 chunks written"));
        assert!(text.ends_with("indexed: 6 chunks in 2/3 batches, skipped batches [1]"));
    }
}
