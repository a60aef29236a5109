//! Fail-open retrieval step.
//!
//! Wraps the search collaborator. A missing index or a failing search
//! degrades to an empty document list; generation then runs without
//! context and the answer admits insufficient information.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::Document;
use crate::index::DocumentSearch;

/// Retrieves context documents for a question.
#[derive(Clone)]
pub struct Retriever {
    backend: Option<Arc<dyn DocumentSearch>>,
    top_k: usize,
}

impl Retriever {
    /// Creates a retriever over `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn DocumentSearch>, top_k: usize) -> Self {
        Self {
            backend: Some(backend),
            top_k,
        }
    }

    /// Creates a retriever with no index loaded. Every retrieval is empty.
    #[must_use]
    pub const fn unavailable(top_k: usize) -> Self {
        Self {
            backend: None,
            top_k,
        }
    }

    /// Returns `true` if a search backend is attached.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Documents requested per retrieval.
    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieves documents for `query` in the order the backend ranks them.
    ///
    /// Never fails: an absent backend or a search error yields an empty list.
    pub async fn retrieve(&self, query: &str) -> Vec<Document> {
        let Some(backend) = &self.backend else {
            warn!("no index loaded; continuing without context");
            return Vec::new();
        };

        match backend.search(query, self.top_k).await {
            Ok(documents) => {
                debug!(
                    backend = backend.name(),
                    count = documents.len(),
                    "documents retrieved"
                );
                documents
            }
            Err(e) => {
                warn!(
                    backend = backend.name(),
                    error = %e,
                    "search unavailable; continuing without context"
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .field("top_k", &self.top_k)
            .finish()
    }
}
