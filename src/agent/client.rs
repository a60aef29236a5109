//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] and
//! [`EmbeddingProvider`] implementations, and wires the retriever to the
//! on-disk index.

use std::sync::Arc;

use async_openai::config::{AzureConfig, OpenAIConfig};
use tracing::warn;

use crate::agent::config::AgentConfig;
use crate::agent::provider::{EmbeddingProvider, LlmProvider};
use crate::agent::providers::OpenAiProvider;
use crate::agent::retriever::Retriever;
use crate::error::{AgentError, IndexError};
use crate::index::SqliteIndex;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): `OpenAI`-compatible APIs via `async-openai`
/// - `"azure"`: Azure `OpenAI` deployments
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names
/// and [`AgentError::ConfigMissing`] for an Azure config without endpoint.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn LlmProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::<OpenAIConfig>::new(config))),
        "azure" => Ok(Arc::new(OpenAiProvider::<AzureConfig>::azure(config)?)),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates an [`EmbeddingProvider`] based on the configured provider name.
///
/// # Errors
///
/// Same as [`create_provider`].
pub fn create_embedder(config: &AgentConfig) -> Result<Arc<dyn EmbeddingProvider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::<OpenAIConfig>::new(config))),
        "azure" => Ok(Arc::new(OpenAiProvider::<AzureConfig>::azure(config)?)),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Opens the index at [`AgentConfig::index_path`] and wraps it in a
/// [`Retriever`].
///
/// A missing index file is not an error: the retriever is created without
/// a backend and every retrieval comes back empty.
///
/// # Errors
///
/// Returns [`IndexError`] if the file exists but cannot be loaded.
pub fn create_retriever(
    config: &AgentConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<Retriever, IndexError> {
    match SqliteIndex::open(&config.index_path, embedder) {
        Ok(index) => Ok(Retriever::new(Arc::new(index), config.search_top_k)),
        Err(IndexError::NotFound { path }) => {
            warn!(
                path = %path.display(),
                "index not found; answers will be generated without context"
            );
            Ok(Retriever::unavailable(config.search_top_k))
        }
        Err(e) => Err(e),
    }
}
