//! Read-only vector index used by the retriever.
//!
//! The index is built offline; this module only opens and queries it.
//!
//! ```text
//! query ──► EmbeddingProvider::embed ──► cosine vs. every row ──► top-k Documents
//! ```

pub mod similarity;
pub mod sqlite;

use async_trait::async_trait;

use crate::core::Document;
use crate::error::IndexError;

pub use sqlite::{IndexEntry, SqliteIndex};

/// Search collaborator consumed by the retriever.
///
/// Implementations return documents ranked highest-relevance first; callers
/// keep that order as given.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Returns up to `top_k` documents for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] when the backend cannot serve the query.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Document>, IndexError>;
}
