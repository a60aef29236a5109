//! Pluggable LLM provider traits.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. This keeps all agent logic decoupled
//! from any particular LLM vendor.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::AgentError;

/// Trait for text-completion backends.
///
/// Implementations handle the transport layer (HTTP, SDK calls, timeouts)
/// for a specific provider while presenting a uniform interface to agents.
/// A single provider is shared by the generator and the critic.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"azure"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or parse errors.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}

/// Trait for embedding backends used to vectorise queries.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"azure"`).
    fn name(&self) -> &'static str;

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures, timeouts, or empty responses.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError>;
}
