//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! The same implementation serves `OpenAI`-compatible endpoints and Azure
//! `OpenAI`; only the SDK config type differs. Azure routes by deployment,
//! so chat and embeddings get separate clients.

use std::future::Future;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::{AzureConfig, Config, OpenAIConfig};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateEmbeddingRequestArgs,
};
use async_trait::async_trait;
use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
use crate::agent::provider::{EmbeddingProvider, LlmProvider};
use crate::error::AgentError;

/// Request field carrying the completion token limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenLimit {
    /// `max_completion_tokens`, the current `OpenAI` field.
    Completion,
    /// `max_tokens`, accepted by every Azure `api-version`.
    Legacy,
}

/// `OpenAI`-compatible LLM provider.
///
/// Wraps two `async-openai` clients: one for chat completions and one for
/// embeddings. For plain `OpenAI` they share a config; for Azure each points
/// at its own deployment and API version.
pub struct OpenAiProvider<C: Config = OpenAIConfig> {
    name: &'static str,
    chat_client: Client<C>,
    embedding_client: Client<C>,
    embedding_model: String,
    timeout: Duration,
    token_limit: TokenLimit,
}

impl OpenAiProvider<OpenAIConfig> {
    /// Creates a provider for `OpenAI` or any `OpenAI`-compatible base URL.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            name: "openai",
            chat_client: Client::with_config(openai_config.clone()),
            embedding_client: Client::with_config(openai_config),
            embedding_model: config.embedding_model.clone(),
            timeout: config.timeout,
            token_limit: TokenLimit::Completion,
        }
    }
}

impl OpenAiProvider<AzureConfig> {
    /// Creates a provider for Azure `OpenAI`.
    ///
    /// `chat_model` and `embedding_model` are used as deployment ids.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigMissing`] if no endpoint is configured.
    pub fn azure(config: &AgentConfig) -> Result<Self, AgentError> {
        let endpoint = config
            .base_url
            .as_deref()
            .ok_or_else(|| AgentError::ConfigMissing {
                field: "base_url",
                hint: "set AZURE_OPENAI_ENDPOINT to the Azure OpenAI resource endpoint"
                    .to_string(),
            })?;

        let azure = |deployment: &str, api_version: &str| {
            AzureConfig::new()
                .with_api_base(endpoint)
                .with_api_key(&config.api_key)
                .with_deployment_id(deployment)
                .with_api_version(api_version)
        };

        Ok(Self {
            name: "azure",
            chat_client: Client::with_config(azure(&config.chat_model, &config.chat_api_version)),
            embedding_client: Client::with_config(azure(
                &config.embedding_model,
                &config.embedding_api_version,
            )),
            embedding_model: config.embedding_model.clone(),
            timeout: config.timeout,
            token_limit: TokenLimit::Legacy,
        })
    }
}

impl<C: Config> OpenAiProvider<C> {
    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    #[allow(deprecated)]
    fn build_request(request: &ChatRequest, token_limit: TokenLimit) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();
        let (max_completion_tokens, max_tokens) = match token_limit {
            TokenLimit::Completion => (request.max_tokens, None),
            TokenLimit::Legacy => (None, request.max_tokens),
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens,
            max_tokens,
            ..Default::default()
        }
    }

    /// Runs a provider call under the configured timeout.
    async fn with_timeout<T, F>(&self, operation: &'static str, call: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, async_openai::error::OpenAIError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            }),
            Err(_) => Err(AgentError::Timeout {
                operation,
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

impl<C: Config> std::fmt::Debug for OpenAiProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("name", &self.name)
            .field("client", &"<async-openai::Client>")
            .field("embedding_model", &self.embedding_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl<C> LlmProvider for OpenAiProvider<C>
where
    C: Config + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request, self.token_limit);

        let response = self
            .with_timeout("chat", self.chat_client.chat().create(openai_request))
            .await?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        let finish_reason = choice.and_then(|c| {
            c.finish_reason
                .as_ref()
                .map(|fr| format!("{fr:?}").to_lowercase())
        });

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        debug!(
            provider = self.name,
            model = %request.model,
            total_tokens = usage.total_tokens,
            "chat completion received"
        );

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}

#[async_trait]
impl<C> EmbeddingProvider for OpenAiProvider<C>
where
    C: Config + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.embedding_model.clone())
            .input(text.to_string())
            .build()
            .map_err(|e| AgentError::Embedding {
                message: e.to_string(),
            })?;

        let response = self
            .with_timeout("embed", self.embedding_client.embeddings().create(request))
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| AgentError::Embedding {
                message: "response contained no embedding".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message;

    fn test_config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_convert_system_message() {
        let msg = message::system_message("test");
        let converted = OpenAiProvider::<OpenAIConfig>::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn test_convert_user_message() {
        let msg = message::user_message("hello");
        let converted = OpenAiProvider::<OpenAIConfig>::convert_message(&msg);
        assert!(matches!(converted, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_request_passes_sampling_settings() {
        let request = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![message::system_message("sys"), message::user_message("test")],
            temperature: Some(0.0),
            max_tokens: Some(100),
        };
        let built =
            OpenAiProvider::<OpenAIConfig>::build_request(&request, TokenLimit::Completion);
        assert_eq!(built.model, "gpt-4o-mini");
        assert_eq!(built.messages.len(), 2);
        assert_eq!(built.temperature, Some(0.0));
        assert_eq!(built.max_completion_tokens, Some(100));
        assert!(built.stream.is_none());
    }

    #[test]
    #[allow(deprecated)]
    fn test_azure_request_uses_max_tokens() {
        let azure_config = AgentConfig::builder()
            .api_key("test")
            .provider("azure")
            .base_url("https://example.openai.azure.com")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let azure = OpenAiProvider::azure(&azure_config).unwrap_or_else(|_| unreachable!());
        assert_eq!(azure.token_limit, TokenLimit::Legacy);
        assert_eq!(OpenAiProvider::new(&test_config()).token_limit, TokenLimit::Completion);

        let request = ChatRequest {
            model: "chat-deployment".to_string(),
            messages: vec![message::user_message("test")],
            temperature: Some(0.0),
            max_tokens: Some(16),
        };
        let built = OpenAiProvider::<AzureConfig>::build_request(&request, azure.token_limit);
        assert_eq!(built.max_tokens, Some(16));
        assert!(built.max_completion_tokens.is_none());
    }

    #[test]
    fn test_provider_names() {
        let openai = OpenAiProvider::new(&test_config());
        assert_eq!(LlmProvider::name(&openai), "openai");

        let azure_config = AgentConfig::builder()
            .api_key("test")
            .provider("azure")
            .base_url("https://example.openai.azure.com")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let azure = OpenAiProvider::azure(&azure_config).unwrap_or_else(|_| unreachable!());
        assert_eq!(EmbeddingProvider::name(&azure), "azure");
    }

    #[test]
    fn test_azure_requires_endpoint() {
        let result = OpenAiProvider::azure(&test_config());
        assert!(matches!(
            result,
            Err(AgentError::ConfigMissing {
                field: "base_url",
                ..
            })
        ));
    }
}
