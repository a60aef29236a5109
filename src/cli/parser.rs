//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ragloop: question answering over a document index with self-critique.
///
/// Answers are generated from retrieved context, checked by a critic, and
/// regenerated with fresh retrieval until the critic accepts them or the
/// attempt budget runs out.
#[derive(Parser, Debug)]
#[command(name = "ragloop")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the vector index file.
    ///
    /// Defaults to `index/index.db` in the current directory.
    #[arg(short, long, global = true, env = "RAGLOOP_INDEX_PATH")]
    pub index: Option<PathBuf>,

    /// Directory containing prompt template files.
    #[arg(long, global = true, env = "RAGLOOP_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive question-answer session.
    ///
    /// Type `quit`, `exit`, `bye`, or `q` to leave.
    #[command(after_help = r#"Examples:
  ragloop chat                         # Use ./index/index.db
  ragloop --index ./papers.db chat     # Use a different index
"#)]
    Chat,

    /// Answer a single question.
    #[command(after_help = r#"Examples:
  ragloop ask "What is the main methodology?"
  ragloop --format json ask "Who is the author of the paper?" | jq .attempts
"#)]
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Run the evaluation suite and save per-question results.
    #[command(after_help = r#"Examples:
  ragloop eval                                    # Built-in gold questions
  ragloop eval --cases gold.json --output out.json
"#)]
    Eval {
        /// JSON file with an array of `{question, expected_info}` cases.
        #[arg(short, long)]
        cases: Option<PathBuf>,

        /// Results file.
        #[arg(short, long, default_value = crate::eval::DEFAULT_RESULTS_PATH)]
        output: PathBuf,
    },

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are left untouched.
    InitPrompts {
        /// Target directory (defaults to `~/.config/ragloop/prompts`).
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the index path, using the default if not specified.
    #[must_use]
    pub fn get_index_path(&self) -> PathBuf {
        self.index
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::agent::config::DEFAULT_INDEX_PATH))
    }
}
