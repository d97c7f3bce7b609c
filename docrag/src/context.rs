//! Prompt context and citations built from retrieval matches.

use serde::{Deserialize, Serialize};

use crate::document::RetrievalMatch;

/// Separator between rendered chunks in the context block.
const BLOCK_SEPARATOR: &str = "\n\n";

/// Render matches as one prompt-ready block.
///
/// Each match becomes a header line with its document id and source followed
/// by the chunk text:
///
/// ```text
/// [doc_id=12] source: doc/_sources/classes/class_node.rst.txt
/// Node is the base class for all scene objects.
/// ```
///
/// Blocks keep the match order and are separated by a blank line. No matches
/// give an empty string.
pub fn build_context(matches: &[RetrievalMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("[doc_id={}] source: {}\n{}", m.metadata.doc_id, m.metadata.source, m.text))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// A reference from an answer back to the corpus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    /// Id of the cited document.
    pub doc_id: String,
    /// Source file of the cited chunk.
    pub source: String,
    /// `1 - distance` rounded to four decimals. Not clamped: a distance
    /// above 1 gives a negative score.
    pub score: f64,
}

/// One citation per match, in match order.
pub fn build_citations(matches: &[RetrievalMatch]) -> Vec<Citation> {
    matches
        .iter()
        .map(|m| Citation {
            doc_id: m.metadata.doc_id.clone(),
            source: m.metadata.source.clone(),
            score: similarity_score(m.distance),
        })
        .collect()
}

/// `round(1 - distance, 4)`, computed in `f64`.
pub fn similarity_score(distance: f32) -> f64 {
    let similarity = 1.0 - f64::from(distance);
    (similarity * 10_000.0).round() / 10_000.0
}
