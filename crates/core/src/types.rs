//! Shared data model.
//!
//! `Passage` is what the vector store hands back for a query; `SourceRef`
//! is the provenance a client sees once an answer has been streamed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Filename reported for passages whose metadata lacks one.
pub const UNKNOWN_FILENAME: &str = "unknown";

/// A retrieved unit of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,

    /// Embedding vector (empty when returned from search results)
    #[serde(default)]
    pub embedding: Vec<f32>,

    /// Provenance metadata (`document_id`, `filename`, `chunk_index`, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Distance to the query; smaller is more relevant
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    /// Create a passage with text and a distance score.
    pub fn new(text: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            embedding: Vec::new(),
            metadata: Map::new(),
            score,
        }
    }

    /// Attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Source filename, or [`UNKNOWN_FILENAME`].
    pub fn filename(&self) -> &str {
        self.metadata
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_FILENAME)
    }

    /// Position of the passage inside its document, 0 when absent.
    pub fn chunk_index(&self) -> i64 {
        self.metadata
            .get("chunk_index")
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Identifier of the document this passage was cut from.
    pub fn document_id(&self) -> Option<&str> {
        self.metadata.get("document_id").and_then(Value::as_str)
    }

    /// Provenance reference for the `sources` event.
    pub fn source_ref(&self) -> SourceRef {
        SourceRef {
            filename: self.filename().to_string(),
            chunk_index: self.chunk_index(),
        }
    }
}

/// Where part of an answer came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub filename: String,
    pub chunk_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_accessors() {
        let passage = Passage::new("Paris is the capital of France.", 0.2)
            .with_metadata("filename", "geo.pdf")
            .with_metadata("chunk_index", 3)
            .with_metadata("document_id", "doc-1");

        assert_eq!(passage.filename(), "geo.pdf");
        assert_eq!(passage.chunk_index(), 3);
        assert_eq!(passage.document_id(), Some("doc-1"));
        assert_eq!(
            passage.source_ref(),
            SourceRef {
                filename: "geo.pdf".to_string(),
                chunk_index: 3
            }
        );
    }

    #[test]
    fn test_missing_metadata_defaults() {
        let passage = Passage::new("orphan", 0.1);
        assert_eq!(passage.filename(), UNKNOWN_FILENAME);
        assert_eq!(passage.chunk_index(), 0);
        assert_eq!(passage.document_id(), None);
    }

    #[test]
    fn test_deserialize_search_result_without_embedding() {
        let passage: Passage = serde_json::from_str(
            r#"{"text":"t","metadata":{"filename":"a.md","chunk_index":1},"score":0.4}"#,
        )
        .unwrap();
        assert!(passage.embedding.is_empty());
        assert_eq!(passage.filename(), "a.md");
    }
}
