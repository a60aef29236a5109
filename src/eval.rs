//! Evaluation harness.
//!
//! Runs a fixed set of questions through the agent loop and records what
//! happened for each one. A failing case is recorded with its error and the
//! suite carries on.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::AgentLoop;
use crate::core::Verdict;
use crate::error::{self, CommandError};

/// Default results file.
pub const DEFAULT_RESULTS_PATH: &str = "eval_results.json";

const MISSING_EXPECTATION: &str = "N/A";

/// One evaluation question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    /// Question to ask.
    pub question: String,
    /// What a good answer should contain, for human review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_info: Option<String>,
}

impl EvalCase {
    /// Creates a case.
    #[must_use]
    pub fn new(question: impl Into<String>, expected_info: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            expected_info: Some(expected_info.into()),
        }
    }
}

/// Recorded result of one case.
#[derive(Debug, Clone, Serialize)]
pub struct EvalRecord {
    /// Question asked.
    pub question: String,
    /// Expected information, or `"N/A"`.
    pub expected_info: String,
    /// Final answer; empty when the session failed.
    pub actual_generation: String,
    /// Completed reflect cycles.
    pub retries_needed: u32,
    /// Verdict on the final answer.
    pub final_reflection: Option<Verdict>,
    /// Whether the final retrieval returned any documents.
    pub context_found: bool,
    /// Contents of the documents behind the final answer.
    pub debug_retrieved_context: Vec<String>,
    /// Session error, if the case failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate counts over a suite run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvalSummary {
    /// Cases run.
    pub total: usize,
    /// Cases ending with a satisfactory verdict.
    pub satisfactory: usize,
    /// Cases whose session failed.
    pub failed: usize,
    /// Cases where retrieval found context.
    pub with_context: usize,
}

impl EvalSummary {
    /// Summarizes `records`.
    #[must_use]
    pub fn from_records(records: &[EvalRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, r| {
            acc.total += 1;
            if r.final_reflection.is_some_and(|v| v.is_satisfactory()) {
                acc.satisfactory += 1;
            }
            if r.error.is_some() {
                acc.failed += 1;
            }
            if r.context_found {
                acc.with_context += 1;
            }
            acc
        })
    }
}

impl std::fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} case(s): {} satisfactory, {} failed, {} with context",
            self.total, self.satisfactory, self.failed, self.with_context
        )
    }
}

/// Built-in gold questions.
#[must_use]
pub fn default_cases() -> Vec<EvalCase> {
    vec![
        EvalCase::new("Who is the author of the paper?", "Names of authors"),
        EvalCase::new(
            "What is the main methodology used?",
            "Specific techniques mentioned",
        ),
        EvalCase::new(
            "What are the key results?",
            "Statistical findings or conclusions",
        ),
    ]
}

/// Reads cases from a JSON array file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a JSON array of
/// cases.
pub fn load_cases(path: &Path) -> error::Result<Vec<EvalCase>> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        CommandError::InvalidInput(format!("invalid eval cases in {}: {e}", path.display()))
            .into()
    })
}

/// Runs every case sequentially.
pub async fn run_suite(agent: &AgentLoop, cases: &[EvalCase]) -> Vec<EvalRecord> {
    info!(cases = cases.len(), "evaluation started");

    let mut records = Vec::with_capacity(cases.len());
    for case in cases {
        info!(question = %case.question, "evaluating");
        let expected_info = case
            .expected_info
            .clone()
            .unwrap_or_else(|| MISSING_EXPECTATION.to_string());

        let record = match agent.run(&case.question).await {
            Ok(outcome) => {
                let retrieved: Vec<String> =
                    outcome.documents.into_iter().map(|d| d.content).collect();
                EvalRecord {
                    question: case.question.clone(),
                    expected_info,
                    actual_generation: outcome.answer,
                    retries_needed: outcome.attempts,
                    final_reflection: Some(outcome.final_verdict),
                    context_found: !retrieved.is_empty(),
                    debug_retrieved_context: retrieved,
                    error: None,
                }
            }
            Err(e) => {
                warn!(question = %case.question, error = %e, "case failed");
                EvalRecord {
                    question: case.question.clone(),
                    expected_info,
                    actual_generation: String::new(),
                    retries_needed: 0,
                    final_reflection: None,
                    context_found: false,
                    debug_retrieved_context: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        records.push(record);
    }

    info!(summary = %EvalSummary::from_records(&records), "evaluation complete");
    records
}

/// Writes records as pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_results(path: &Path, records: &[EvalRecord]) -> error::Result<()> {
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| CommandError::OutputFormat(format!("JSON serialization failed: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}
