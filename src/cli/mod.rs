//! CLI layer for ragloop.
//!
//! Provides the command-line interface using clap, with commands for
//! chatting, one-shot questions, evaluation, and prompt setup.

pub mod commands;
pub mod output;
pub mod parser;
pub mod progress;
pub mod repl;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
