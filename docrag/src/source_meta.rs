//! Mapping from index position to document id and source file.
//!
//! Document ids are the decimal ordinal of each entry in the index's
//! `filenames` array. Every citation points back through this id, so the
//! mapping never sorts or deduplicates its input, and loading a persisted
//! mapping re-checks that entry `i` carries id `"i"`.

use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::document::SourceDocument;
use crate::error::{RagError, Result};

/// Ordered `doc_id → {name, source}` mapping for one corpus build.
///
/// Serialized as a JSON object whose keys appear in ordinal order:
///
/// ```json
/// {"0": {"name": "404", "source": "doc/_sources/404.txt"}, "1": {...}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMeta {
    documents: Vec<SourceDocument>,
}

#[derive(Serialize, Deserialize)]
struct SourceEntry {
    name: String,
    source: String,
}

impl SourceMeta {
    /// Build the mapping from the index's ordered filenames.
    ///
    /// Position `i` becomes `doc_id = i.to_string()`; `source` is
    /// `source_dir/{name}{extension}`.
    pub fn from_filenames(filenames: &[String], source_dir: &Path, extension: &str) -> Self {
        let documents = filenames
            .iter()
            .enumerate()
            .map(|(position, name)| SourceDocument {
                doc_id: position.to_string(),
                name: name.clone(),
                source: source_dir.join(format!("{name}{extension}")).to_string_lossy().into_owned(),
            })
            .collect();
        Self { documents }
    }

    /// Documents in ordinal order.
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    /// Look up a document by id.
    pub fn get(&self, doc_id: &str) -> Option<&SourceDocument> {
        let position: usize = doc_id.parse().ok()?;
        self.documents.get(position).filter(|doc| doc.doc_id == doc_id)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus has no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Write the mapping as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), documents = self.len(), "wrote source mapping");
        Ok(())
    }

    /// Load a mapping written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FormatError`] if the file is not a mapping or its
    /// keys are not the ordinals `0..n` in order.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            RagError::FormatError(format!("invalid source mapping {}: {e}", path.display()))
        })
    }
}

impl Serialize for SourceMeta {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.documents.len()))?;
        for doc in &self.documents {
            map.serialize_entry(
                &doc.doc_id,
                &SourceEntry { name: doc.name.clone(), source: doc.source.clone() },
            )?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SourceMeta {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrdinalVisitor;

        impl<'de> Visitor<'de> for OrdinalVisitor {
            type Value = SourceMeta;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from ordinal doc ids to {name, source}")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<SourceMeta, A::Error> {
                let mut documents = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((doc_id, entry)) = access.next_entry::<String, SourceEntry>()? {
                    let expected = documents.len().to_string();
                    if doc_id != expected {
                        return Err(serde::de::Error::custom(format!(
                            "doc id `{doc_id}` found at position {expected}"
                        )));
                    }
                    documents.push(SourceDocument { doc_id, name: entry.name, source: entry.source });
                }
                Ok(SourceMeta { documents })
            }
        }

        deserializer.deserialize_map(OrdinalVisitor)
    }
}
