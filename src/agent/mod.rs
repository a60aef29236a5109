//! Question-answering agent with a self-critique retry loop.
//!
//! Uses a pluggable provider abstraction backed by `OpenAI`-compatible APIs
//! or Azure `OpenAI`. One provider serves both the generator and the critic.
//!
//! # Architecture
//!
//! ```text
//! question → AgentLoop
//!   ├── Retriever (fail-open search over the vector index)
//!   ├── GeneratorAgent (answers from retrieved context only)
//!   ├── CriticAgent (accurate / needs_revision)
//!   └── RetryPolicy (done when satisfied or attempts exhausted)
//! ```

pub mod agent_loop;
pub mod client;
pub mod config;
pub mod critic;
pub mod generator;
pub mod message;
pub mod policy;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retriever;
pub mod state;
pub mod traits;

// Re-export key types
pub use agent_loop::{AgentLoop, LoopEvent};
pub use config::AgentConfig;
pub use critic::{CriticAgent, Critique};
pub use generator::GeneratorAgent;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use policy::RetryPolicy;
pub use prompt::PromptSet;
pub use provider::{EmbeddingProvider, LlmProvider};
pub use retriever::Retriever;
pub use state::{Phase, SessionOutcome, SessionState};
pub use traits::{Agent, AgentResponse};
