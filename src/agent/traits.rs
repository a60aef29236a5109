//! Agent trait definition.
//!
//! The generator and critic both implement this trait, which turns a
//! role-specific user message into a single chat completion.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

impl AgentResponse {
    /// Returns `true` if the model stopped at the token limit.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (answering, critiquing) with a fixed
/// system prompt and model configuration. The agent loop calls
/// [`Agent::execute`] to run the agent against a provider.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        1024
    }

    /// Builds the chat request for the given user message.
    fn build_request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        }
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or timeouts.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.build_request(user_msg);

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
