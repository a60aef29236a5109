//! Generator agent.
//!
//! Answers the question strictly from the retrieved context, declining
//! when the context is insufficient.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::prompt::build_generator_prompt;
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::core::Document;
use crate::error::AgentError;

/// Agent that synthesizes an answer from context documents.
///
/// An "insufficient information" reply is a valid answer, not an error.
/// Nothing is cached: the same question and documents are recomputed on
/// every call.
pub struct GeneratorAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl GeneratorAgent {
    /// Creates a new generator with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.generator_max_tokens,
            system_prompt,
        }
    }

    /// Generates an answer for `question` from `documents`.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; they end the session.
    pub async fn generate(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        documents: &[Document],
    ) -> Result<AgentResponse, AgentError> {
        let user_msg = build_generator_prompt(question, documents);
        let response = self.execute(provider, &user_msg).await?;
        if response.is_truncated() {
            warn!(
                max_tokens = self.max_tokens,
                "answer cut off at the token limit"
            );
        }
        debug!(
            documents = documents.len(),
            answer_len = response.content.len(),
            "answer generated"
        );
        Ok(response)
    }
}

#[async_trait]
impl Agent for GeneratorAgent {
    fn name(&self) -> &'static str {
        "generator"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
