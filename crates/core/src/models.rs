use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
pub const DEFAULT_TOP_K: usize = 2;
pub const DEFAULT_INDEX_NAME: &str = "finance-insights";

/// Metadata attached to every stored vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
}

impl DocumentMetadata {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

/// An uploaded document after extraction. Only `key`, the embedding and the
/// metadata ever leave the process; the text is dropped after embedding.
#[derive(Debug, Clone)]
pub struct Document {
    pub key: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            key: filename.clone(),
            text: text.into(),
            metadata: DocumentMetadata::new(filename),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub score: f32,
    pub metadata: DocumentMetadata,
}

impl Match {
    pub fn filename(&self) -> &str {
        &self.metadata.filename
    }
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "File: {} (Score: {:.2})", self.filename(), self.score)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        }
    }
}

/// The shape an index must have to accept our vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::Cosine,
        }
    }
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME, DEFAULT_EMBEDDING_DIMENSIONS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreReceipt {
    pub key: String,
    pub characters: usize,
    pub checksum: String,
    pub stored_at: DateTime<Utc>,
    pub backend: String,
}

impl StoreReceipt {
    pub fn message(&self) -> String {
        format!("Stored {} in {}.", self.key, self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_renders_two_decimal_score() {
        let hit = Match {
            id: "policy.pdf".to_string(),
            score: 0.92871,
            metadata: DocumentMetadata::new("policy.pdf"),
        };
        assert_eq!(hit.to_string(), "File: policy.pdf (Score: 0.93)");
    }

    #[test]
    fn document_key_is_filename() {
        let document = Document::new("report.pdf", "text");
        assert_eq!(document.key, "report.pdf");
        assert_eq!(document.metadata.filename, "report.pdf");
    }

    #[test]
    fn receipt_message_names_backend() {
        let receipt = StoreReceipt {
            key: "a.pdf".to_string(),
            characters: 3,
            checksum: String::new(),
            stored_at: Utc::now(),
            backend: "Pinecone".to_string(),
        };
        assert_eq!(receipt.message(), "Stored a.pdf in Pinecone.");
    }
}
