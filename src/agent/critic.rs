//! Critic agent.
//!
//! Asks the model whether an answer is accurate and complete and maps the
//! free-text reply onto a [`Verdict`].

use async_trait::async_trait;
use tracing::debug;

use super::config::AgentConfig;
use super::message::TokenUsage;
use super::prompt::build_critic_prompt;
use super::provider::LlmProvider;
use super::traits::Agent;
use crate::core::Verdict;
use crate::error::AgentError;

/// Outcome of one critique call.
#[derive(Debug, Clone)]
pub struct Critique {
    /// Classified verdict.
    pub verdict: Verdict,
    /// Raw model output, kept for diagnostics.
    pub raw: String,
    /// Token usage for the call.
    pub usage: TokenUsage,
}

/// Agent that classifies an answer as satisfactory or not.
pub struct CriticAgent {
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
}

impl CriticAgent {
    /// Creates a new critic with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.critic_max_tokens,
            system_prompt,
        }
    }

    /// Critiques `answer` as a response to `question`.
    ///
    /// An unparseable reply is not an error: it classifies as
    /// [`Verdict::NeedsRevision`] (see [`Verdict::from_critique`]).
    ///
    /// # Errors
    ///
    /// Propagates provider failures; they end the session.
    pub async fn critique(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        answer: &str,
    ) -> Result<Critique, AgentError> {
        let user_msg = build_critic_prompt(question, answer);
        let response = self.execute(provider, &user_msg).await?;
        let verdict = Verdict::from_critique(&response.content);
        debug!(%verdict, raw = %response.content.trim(), "critique classified");
        Ok(Critique {
            verdict,
            raw: response.content,
            usage: response.usage,
        })
    }
}

#[async_trait]
impl Agent for CriticAgent {
    fn name(&self) -> &'static str {
        "critic"
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
