//! # ragloop
//!
//! Question answering over a pre-built document index with a
//! retrieve → generate → reflect loop. A critic reviews every answer; a
//! rejected answer triggers fresh retrieval and regeneration until the
//! critic accepts it or the attempt budget is spent.
//!
//! ## Example
//!
//! ```no_run
//! use ragloop::agent::client::{create_embedder, create_provider, create_retriever};
//! use ragloop::agent::{AgentConfig, AgentLoop};
//!
//! # async fn example() -> ragloop::Result<()> {
//! let config = AgentConfig::from_env()?;
//! let provider = create_provider(&config)?;
//! let retriever = create_retriever(&config, create_embedder(&config)?)?;
//! let agent = AgentLoop::new(provider, retriever, &config);
//!
//! let outcome = agent.run("What is the main methodology?").await?;
//! println!("{} ({} attempts, {})", outcome.answer, outcome.attempts, outcome.final_verdict);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod eval;
pub mod index;

pub use agent::{AgentConfig, AgentLoop, SessionOutcome};
pub use crate::core::{Document, Verdict};
pub use error::{AgentError, CommandError, Error, IndexError, Result};
