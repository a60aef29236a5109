//! Error types for ragloop.
//!
//! Each layer has its own error enum; [`Error`] aggregates them for the
//! CLI and library callers that want a single type.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Agent, provider, or loop failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Vector index failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure outside of a more specific layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the agent layer: configuration, provider calls, and the
/// retrieve → generate → reflect loop.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key was configured.
    #[error(
        "API key not configured (set OPENAI_API_KEY, RAGLOOP_API_KEY, or AZURE_OPENAI_API_KEY)"
    )]
    ApiKeyMissing,

    /// A required configuration value is missing for the selected provider.
    #[error("missing configuration '{field}': {hint}")]
    ConfigMissing {
        /// Name of the missing setting.
        field: &'static str,
        /// How to provide it.
        hint: String,
    },

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The provider API returned an error.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Error message from the SDK or transport.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// A provider call exceeded the configured timeout.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// Operation that timed out (`chat`, `embed`).
        operation: &'static str,
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// The embedding endpoint returned no vector.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Description of the failure.
        message: String,
    },

    /// The question was empty or whitespace.
    #[error("question cannot be empty")]
    EmptyQuestion,

    /// The question exceeds the accepted length.
    #[error("question exceeds maximum length ({len} bytes, max {max})")]
    QuestionTooLong {
        /// Question length in bytes.
        len: usize,
        /// Maximum accepted length in bytes.
        max: usize,
    },

    /// A session aborted because a generation or critique call failed.
    #[error("session failed for question '{question}': {source}")]
    Session {
        /// The question being answered.
        question: String,
        /// Underlying failure.
        #[source]
        source: Box<AgentError>,
    },
}

impl AgentError {
    /// Wraps this error as a failed session for `question`.
    #[must_use]
    pub fn for_session(self, question: &str) -> Self {
        Self::Session {
            question: question.to_string(),
            source: Box::new(self),
        }
    }
}

/// Errors from the read-only vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index file does not exist.
    #[error("index not found at {}", path.display())]
    NotFound {
        /// Path that was checked.
        path: PathBuf,
    },

    /// `SQLite` failure while opening or reading the index.
    #[error("index database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row could not be decoded.
    #[error("corrupt index row {id}: {message}")]
    Corrupt {
        /// Row id.
        id: i64,
        /// What was wrong with it.
        message: String,
    },

    /// The query could not be embedded.
    #[error("query embedding failed: {0}")]
    Embedding(#[source] AgentError),

    /// The similarity scan did not complete.
    #[error("index search failed: {message}")]
    Search {
        /// Description of the failure.
        message: String,
    },
}

/// Errors from CLI command execution.
#[derive(Error, Debug)]
pub enum CommandError {
    /// A command failed to run.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// User input was invalid.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_names_question() {
        let err = AgentError::ApiRequest {
            message: "rate limited".to_string(),
            status: Some(429),
        }
        .for_session("Who wrote it?");
        let text = err.to_string();
        assert!(text.contains("Who wrote it?"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = AgentError::EmptyQuestion.into();
        assert!(matches!(err, Error::Agent(AgentError::EmptyQuestion)));

        let err: Error = IndexError::NotFound {
            path: PathBuf::from("index/index.db"),
        }
        .into();
        assert!(err.to_string().contains("index/index.db"));
    }
}
