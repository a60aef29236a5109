//! Retrieved context unit.

use serde::{Deserialize, Serialize};

/// A chunk of text returned by the search collaborator.
///
/// `metadata` is passed through untouched (source file, page, ...);
/// nothing in the loop interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Chunk text used as generation context.
    pub content: String,
    /// Opaque metadata from the index.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    /// Similarity score assigned by the search backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Document {
    /// Creates a document with no metadata or score.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: serde_json::Value::Null,
            score: None,
        }
    }

    /// Attaches opaque metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attaches a similarity score.
    #[must_use]
    pub const fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}
