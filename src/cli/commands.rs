//! CLI command implementations.
//!
//! Each command builds what it needs from the environment plus CLI
//! overrides, then bridges into async code with a tokio runtime.
//! `chat` always shows per-step progress on stderr; `ask` does with `-v`.

use std::fmt::Write as FmtWrite;
use std::io;
use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::client::{create_embedder, create_provider, create_retriever};
use crate::agent::{AgentConfig, AgentLoop, PromptSet, SessionOutcome};
use crate::cli::output::{OutputFormat, format_eval_summary, format_outcome};
use crate::cli::parser::{Cli, Commands};
use crate::cli::progress::report;
use crate::cli::repl::chat_loop;
use crate::error::{AgentError, CommandError, Result};
use crate::eval::{EvalSummary, default_cases, load_cases, run_suite, write_results};

/// Executes the CLI command.
///
/// Returns the text to print on success. `chat` writes directly to stdout
/// and returns an empty string.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Chat => cmd_chat(cli),
        Commands::Ask { question } => cmd_ask(cli, question, format),
        Commands::Eval { cases, output } => cmd_eval(cli, cases.as_deref(), output, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds the agent configuration from env plus CLI overrides.
fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder()
        .from_env()
        .index_path(cli.get_index_path());
    if let Some(dir) = &cli.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    builder
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into())
}

/// Wires provider, embedder, and index into an [`AgentLoop`].
fn build_agent(cli: &Cli) -> Result<AgentLoop> {
    let config = load_config(cli)?;
    debug!(
        provider = %config.provider,
        chat_model = %config.chat_model,
        index = %config.index_path.display(),
        max_attempts = config.max_attempts,
        "agent configured"
    );

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;
    let embedder = create_embedder(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Embedding provider creation failed: {e}"))
    })?;
    let retriever = create_retriever(&config, embedder)?;

    Ok(AgentLoop::new(provider, retriever, &config))
}

fn runtime() -> Result<Runtime> {
    Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Runs one session. With `show_progress`, step lines go to stderr while
/// the session runs.
fn run_session(
    rt: &Runtime,
    agent: &AgentLoop,
    question: &str,
    show_progress: bool,
) -> std::result::Result<SessionOutcome, AgentError> {
    if !show_progress {
        return rt.block_on(agent.run(question));
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let mut stderr = io::stderr();
    rt.block_on(async {
        let session = async move {
            let outcome = agent.run_with_events(question, Some(&tx)).await;
            drop(tx);
            outcome
        };
        let (outcome, ()) = tokio::join!(session, report(rx, &mut stderr));
        outcome
    })
}

fn cmd_chat(cli: &Cli) -> Result<String> {
    let agent = build_agent(cli)?;
    let rt = runtime()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let stats = chat_loop(stdin.lock(), &mut stdout, |question| {
        run_session(&rt, &agent, question, true)
    })?;

    debug!(
        answered = stats.answered,
        failed = stats.failed,
        "chat ended"
    );
    Ok(String::new())
}

fn cmd_ask(cli: &Cli, question: &str, format: OutputFormat) -> Result<String> {
    let agent = build_agent(cli)?;
    let rt = runtime()?;

    let outcome = run_session(&rt, &agent, question, cli.verbose)?;
    Ok(format_outcome(&outcome, format))
}

fn cmd_eval(
    cli: &Cli,
    cases_path: Option<&Path>,
    output: &Path,
    format: OutputFormat,
) -> Result<String> {
    let cases = match cases_path {
        Some(path) => load_cases(path)?,
        None => default_cases(),
    };
    if cases.is_empty() {
        return Err(CommandError::InvalidInput("no evaluation cases".to_string()).into());
    }

    let agent = build_agent(cli)?;
    let rt = runtime()?;

    let records = rt.block_on(run_suite(&agent, &cases));
    write_results(output, &records)?;

    Ok(format_eval_summary(
        &EvalSummary::from_records(&records),
        output,
        format,
    ))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
