//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default chat model (or Azure deployment name).
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
/// Default embedding model (or Azure deployment name).
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Default Azure API version for both chat and embeddings.
const DEFAULT_AZURE_API_VERSION: &str = "2024-10-21";
/// Default generator max tokens.
const DEFAULT_GENERATOR_MAX_TOKENS: u32 = 1024;
/// Default critic max tokens. The critic answers with a single word.
const DEFAULT_CRITIC_MAX_TOKENS: u32 = 16;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default bound on completed retrieve → generate → reflect cycles.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default number of documents retrieved per search.
pub const DEFAULT_SEARCH_TOP_K: usize = 10;
/// Default index location, relative to the working directory.
pub const DEFAULT_INDEX_PATH: &str = "index/index.db";

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (`openai` or `azure`).
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override. Required for `azure` (the resource endpoint).
    pub base_url: Option<String>,
    /// Chat model for the generator and critic (deployment name on Azure).
    pub chat_model: String,
    /// Embedding model for query vectors (deployment name on Azure).
    pub embedding_model: String,
    /// Azure API version for chat completions.
    pub chat_api_version: String,
    /// Azure API version for embeddings.
    pub embedding_api_version: String,
    /// Sampling temperature for both agents.
    pub temperature: f32,
    /// Maximum tokens for generated answers.
    pub generator_max_tokens: u32,
    /// Maximum tokens for critic responses.
    pub critic_max_tokens: u32,
    /// Per-call timeout applied to every provider request.
    pub timeout: Duration,
    /// Maximum completed reflect cycles per session.
    pub max_attempts: u32,
    /// Documents requested from the search backend per retrieval.
    pub search_top_k: usize,
    /// Path of the prebuilt vector index.
    pub index_path: PathBuf,
    /// Directory containing prompt template files.
    ///
    /// Files missing from the directory fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    chat_model: Option<String>,
    embedding_model: Option<String>,
    chat_api_version: Option<String>,
    embedding_api_version: Option<String>,
    temperature: Option<f32>,
    generator_max_tokens: Option<u32>,
    critic_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
    search_top_k: Option<usize>,
    index_path: Option<PathBuf>,
    prompt_dir: Option<PathBuf>,
}

fn first_of<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
}

fn parse_of<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the resolution rules.
    #[must_use]
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    /// Populates unset fields from `lookup`, a variable-name to value source.
    ///
    /// The provider is resolved first: `RAGLOOP_PROVIDER`, else `azure` when
    /// `AZURE_OPENAI_ENDPOINT` is set, else `openai`. Credentials, endpoint
    /// and model names are then read from the variables of that provider
    /// before the `RAGLOOP_*` ones. Empty values count as unset.
    #[must_use]
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.is_none() {
            self.provider = first_of(&lookup, &["RAGLOOP_PROVIDER"]).or_else(|| {
                first_of(&lookup, &["AZURE_OPENAI_ENDPOINT"]).map(|_| "azure".to_string())
            });
        }
        let azure = self.provider.as_deref() == Some("azure");

        let (key_vars, url_vars, chat_vars, embedding_vars): (&[&str], &[&str], &[&str], &[&str]) =
            if azure {
                (
                    &["AZURE_OPENAI_API_KEY", "RAGLOOP_API_KEY"],
                    &["AZURE_OPENAI_ENDPOINT", "RAGLOOP_BASE_URL"],
                    &["AZURE_OPENAI_CHAT_DEPLOYMENT_NAME", "RAGLOOP_CHAT_MODEL"],
                    &[
                        "AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME",
                        "RAGLOOP_EMBEDDING_MODEL",
                    ],
                )
            } else {
                (
                    &["OPENAI_API_KEY", "RAGLOOP_API_KEY"],
                    &["OPENAI_BASE_URL", "RAGLOOP_BASE_URL"],
                    &["RAGLOOP_CHAT_MODEL"],
                    &["RAGLOOP_EMBEDDING_MODEL"],
                )
            };

        if self.api_key.is_none() {
            self.api_key = first_of(&lookup, key_vars);
        }
        if self.base_url.is_none() {
            self.base_url = first_of(&lookup, url_vars);
        }
        if self.chat_model.is_none() {
            self.chat_model = first_of(&lookup, chat_vars);
        }
        if self.embedding_model.is_none() {
            self.embedding_model = first_of(&lookup, embedding_vars);
        }
        if azure {
            if self.chat_api_version.is_none() {
                self.chat_api_version = first_of(&lookup, &["AZURE_OPENAI_CHAT_API_VERSION"]);
            }
            if self.embedding_api_version.is_none() {
                self.embedding_api_version =
                    first_of(&lookup, &["AZURE_OPENAI_EMBEDDING_API_VERSION"]);
            }
        }
        if self.max_attempts.is_none() {
            self.max_attempts = parse_of(&lookup, "RAGLOOP_MAX_ATTEMPTS");
        }
        if self.search_top_k.is_none() {
            self.search_top_k = parse_of(&lookup, "RAGLOOP_TOP_K");
        }
        if self.timeout.is_none() {
            self.timeout = parse_of(&lookup, "RAGLOOP_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.index_path.is_none() {
            self.index_path = first_of(&lookup, &["RAGLOOP_INDEX_PATH"]).map(PathBuf::from);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = first_of(&lookup, &["RAGLOOP_PROMPT_DIR"]).map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the chat model.
    #[must_use]
    pub fn chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = Some(model.into());
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Sets the Azure chat API version.
    #[must_use]
    pub fn chat_api_version(mut self, version: impl Into<String>) -> Self {
        self.chat_api_version = Some(version.into());
        self
    }

    /// Sets the Azure embedding API version.
    #[must_use]
    pub fn embedding_api_version(mut self, version: impl Into<String>) -> Self {
        self.embedding_api_version = Some(version.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Sets the generator max tokens.
    #[must_use]
    pub const fn generator_max_tokens(mut self, n: u32) -> Self {
        self.generator_max_tokens = Some(n);
        self
    }

    /// Sets the critic max tokens.
    #[must_use]
    pub const fn critic_max_tokens(mut self, n: u32) -> Self {
        self.critic_max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the maximum number of completed reflect cycles.
    #[must_use]
    pub const fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Sets the number of documents retrieved per search.
    #[must_use]
    pub const fn search_top_k(mut self, n: usize) -> Self {
        self.search_top_k = Some(n);
        self
    }

    /// Sets the vector index path.
    #[must_use]
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            chat_model: self
                .chat_model
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: self
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            chat_api_version: self
                .chat_api_version
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            embedding_api_version: self
                .embedding_api_version
                .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            temperature: self.temperature.unwrap_or(0.0),
            generator_max_tokens: self
                .generator_max_tokens
                .unwrap_or(DEFAULT_GENERATOR_MAX_TOKENS),
            critic_max_tokens: self.critic_max_tokens.unwrap_or(DEFAULT_CRITIC_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            search_top_k: self.search_top_k.unwrap_or(DEFAULT_SEARCH_TOP_K),
            index_path: self
                .index_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.search_top_k, DEFAULT_SEARCH_TOP_K);
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.index_path, PathBuf::from(DEFAULT_INDEX_PATH));
        assert!(config.temperature.abs() < f32::EPSILON);
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("azure")
            .base_url("https://example.openai.azure.com")
            .chat_model("gpt-4o-deployment")
            .embedding_model("embed-deployment")
            .chat_api_version("2024-08-01-preview")
            .max_attempts(5)
            .search_top_k(4)
            .timeout(Duration::from_secs(30))
            .index_path("/tmp/custom.db")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "azure");
        assert_eq!(config.chat_model, "gpt-4o-deployment");
        assert_eq!(config.embedding_model, "embed-deployment");
        assert_eq!(config.chat_api_version, "2024-08-01-preview");
        assert_eq!(config.embedding_api_version, DEFAULT_AZURE_API_VERSION);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.search_top_k, 4);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.index_path, PathBuf::from("/tmp/custom.db"));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const MIXED_ENV: [(&str, &str); 6] = [
        ("OPENAI_API_KEY", "sk-openai"),
        ("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        ("AZURE_OPENAI_API_KEY", "azure-key"),
        ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
        ("AZURE_OPENAI_CHAT_DEPLOYMENT_NAME", "chat-deployment"),
        ("AZURE_OPENAI_CHAT_API_VERSION", "2025-01-01-preview"),
    ];

    #[test]
    fn test_lookup_azure_endpoint_selects_azure_credentials() {
        let config = AgentConfig::builder()
            .from_lookup(lookup(&MIXED_ENV))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "azure");
        assert_eq!(config.api_key, "azure-key");
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://example.openai.azure.com")
        );
        assert_eq!(config.chat_model, "chat-deployment");
        assert_eq!(config.chat_api_version, "2025-01-01-preview");
        assert_eq!(config.embedding_api_version, DEFAULT_AZURE_API_VERSION);
    }

    #[test]
    fn test_lookup_explicit_openai_ignores_azure_variables() {
        let mut vars = MIXED_ENV.to_vec();
        vars.push(("RAGLOOP_PROVIDER", "openai"));
        let config = AgentConfig::builder()
            .from_lookup(lookup(&vars))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "sk-openai");
        assert_eq!(config.base_url.as_deref(), Some("https://api.openai.com/v1"));
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_lookup_skips_empty_and_parses_numbers() {
        let config = AgentConfig::builder()
            .from_lookup(lookup(&[
                ("OPENAI_API_KEY", "  "),
                ("RAGLOOP_API_KEY", "fallback"),
                ("RAGLOOP_MAX_ATTEMPTS", "5"),
                ("RAGLOOP_TOP_K", "not-a-number"),
                ("RAGLOOP_TIMEOUT_SECS", "30"),
            ]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_key, "fallback");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.search_top_k, DEFAULT_SEARCH_TOP_K);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_lookup_keeps_explicit_values() {
        let config = AgentConfig::builder()
            .api_key("explicit")
            .max_attempts(2)
            .from_lookup(lookup(&[
                ("OPENAI_API_KEY", "from-env"),
                ("RAGLOOP_MAX_ATTEMPTS", "7"),
            ]))
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.api_key, "explicit");
        assert_eq!(config.max_attempts, 2);
    }
}
