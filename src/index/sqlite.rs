//! Flat vector index stored in a `SQLite` file.
//!
//! Expected schema (produced by the offline ingestion step):
//!
//! ```sql
//! CREATE TABLE chunks (
//!     id        INTEGER PRIMARY KEY,
//!     content   TEXT NOT NULL,
//!     metadata  TEXT,            -- JSON, passed through untouched
//!     embedding BLOB NOT NULL    -- little-endian f32 array
//! );
//! ```
//!
//! All rows are loaded once at open time. The loaded index is immutable, so
//! one instance can serve any number of concurrent sessions.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rayon::prelude::*;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use super::DocumentSearch;
use super::similarity::{cosine_similarity, decode_embedding};
use crate::agent::provider::EmbeddingProvider;
use crate::core::Document;
use crate::error::IndexError;

/// One indexed chunk with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Row id.
    pub id: i64,
    /// Chunk text.
    pub content: String,
    /// Opaque metadata.
    pub metadata: serde_json::Value,
    /// Chunk embedding.
    pub embedding: Vec<f32>,
}

/// In-memory flat index loaded from `SQLite`, queried by cosine similarity.
pub struct SqliteIndex {
    entries: Arc<[IndexEntry]>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteIndex {
    /// Opens the index at `path` and loads every row.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotFound`] if the file does not exist,
    /// [`IndexError::Database`] on `SQLite` failures, and
    /// [`IndexError::Corrupt`] for rows with an undecodable embedding.
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let entries = Self::load_entries(&conn)?;

        info!(path = %path.display(), chunks = entries.len(), "index loaded");
        Ok(Self::from_entries(entries, embedder))
    }

    /// Builds an index from already-loaded entries.
    #[must_use]
    pub fn from_entries(entries: Vec<IndexEntry>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            entries: Arc::from(entries.into_boxed_slice()),
            embedder,
        }
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index holds no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load_entries(conn: &Connection) -> Result<Vec<IndexEntry>, IndexError> {
        let mut stmt =
            conn.prepare("SELECT id, content, metadata, embedding FROM chunks ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, content, metadata, blob) = row?;
            let embedding = decode_embedding(&blob).ok_or_else(|| IndexError::Corrupt {
                id,
                message: format!("embedding blob has {} bytes, not a multiple of 4", blob.len()),
            })?;
            entries.push(IndexEntry {
                id,
                content,
                metadata: parse_metadata(metadata),
                embedding,
            });
        }

        Ok(entries)
    }

    /// Scores every entry against `query` and returns the `top_k` best.
    ///
    /// Entries with a different dimension are skipped. Ties keep row order.
    fn rank(entries: &[IndexEntry], query: &[f32], top_k: usize) -> Vec<Document> {
        let mut scored: Vec<(usize, f32)> = entries
            .par_iter()
            .enumerate()
            .filter_map(|(idx, entry)| {
                cosine_similarity(&entry.embedding, query).map(|score| (idx, score))
            })
            .collect();

        let skipped = entries.len() - scored.len();
        if skipped > 0 {
            debug!(skipped, "entries skipped (dimension mismatch or zero norm)");
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(idx, score)| {
                let entry = &entries[idx];
                Document::new(entry.content.clone())
                    .with_metadata(entry.metadata.clone())
                    .with_score(score)
            })
            .collect()
    }
}

/// Parses the metadata column; non-JSON text is kept as a string.
fn parse_metadata(raw: Option<String>) -> serde_json::Value {
    match raw {
        None => serde_json::Value::Null,
        Some(text) => {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        }
    }
}

#[async_trait]
impl DocumentSearch for SqliteIndex {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Document>, IndexError> {
        if top_k == 0 || self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed(query)
            .await
            .map_err(IndexError::Embedding)?;

        let entries = Arc::clone(&self.entries);
        tokio::task::spawn_blocking(move || Self::rank(&entries, &query_vec, top_k))
            .await
            .map_err(|e| IndexError::Search {
                message: format!("similarity scan join failed: {e}"),
            })
    }
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("entries", &self.entries.len())
            .field("embedder", &self.embedder.name())
            .finish()
    }
}
