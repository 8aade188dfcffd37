//! Pages, chunks and scored hits.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key for the file a page was read from.
pub const SOURCE_KEY: &str = "source";
/// Metadata key for the zero-based page number.
pub const PAGE_KEY: &str = "page";
/// Metadata key for a chunk's position within its page.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Text to be indexed. The loader emits one per PDF page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// `"{source}#{page}"` for loaded pages.
    pub id: String,
    pub text: String,
    /// At least `source` and `page` for loaded pages.
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// A page of `source`; `page` counts from zero.
    pub fn page(source: impl Into<String>, page: usize, text: impl Into<String>) -> Self {
        let source = source.into();
        let metadata = HashMap::from([
            (SOURCE_KEY.to_string(), source.clone()),
            (PAGE_KEY.to_string(), page.to_string()),
        ]);
        Self { id: format!("{source}#{page}"), text: text.into(), metadata, source_uri: Some(source) }
    }
}

/// A window of a [`Document`]'s text, the unit that gets embedded and searched.
///
/// `embedding` is empty until the pipeline fills it and is never serialized,
/// so `--json` answers stay readable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `"{document_id}_{n}"`.
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing)]
    pub embedding: Vec<f32>,
    /// The document's metadata plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    pub document_id: String,
}

impl Chunk {
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// Zero-based page, when the chunk came from a loaded PDF.
    pub fn page(&self) -> Option<usize> {
        self.metadata.get(PAGE_KEY).and_then(|p| p.parse().ok())
    }
}

/// A chunk returned for a question with its cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_document_carries_provenance() {
        let doc = Document::page("reports/acme.pdf", 3, "Revenue grew.");
        assert_eq!(doc.id, "reports/acme.pdf#3");
        assert_eq!(doc.metadata[SOURCE_KEY], "reports/acme.pdf");
        assert_eq!(doc.metadata[PAGE_KEY], "3");
        assert_eq!(doc.source_uri.as_deref(), Some("reports/acme.pdf"));
    }

    #[test]
    fn chunk_embedding_is_not_serialized() {
        let chunk = Chunk {
            id: "a_0".into(),
            text: "hello".into(),
            embedding: vec![1.0, 2.0],
            metadata: HashMap::from([(PAGE_KEY.to_string(), "7".to_string())]),
            document_id: "a".into(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(chunk.page(), Some(7));
        assert_eq!(chunk.source(), None);
    }
}
