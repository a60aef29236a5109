//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::SessionOutcome;
use crate::eval::EvalSummary;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One JSON object per line.
    Ndjson,
}

impl OutputFormat {
    /// Parses a format name; unknown names fall back to text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "ndjson" | "jsonl" => Self::Ndjson,
            _ => Self::Text,
        }
    }

    /// Serializes `value` in this format's JSON style.
    ///
    /// Text falls back to pretty JSON.
    #[must_use]
    pub fn to_json<T: Serialize>(self, value: &T) -> String {
        let rendered = match self {
            Self::Ndjson => serde_json::to_string(value),
            Self::Text | Self::Json => serde_json::to_string_pretty(value),
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Formats a session outcome for `ask`.
#[must_use]
pub fn format_outcome(outcome: &SessionOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = outcome.answer.clone();
            let _ = write!(
                output,
                "\n\n---\nAttempts: {} | Verdict: {} | Documents: {} | Tokens: {} | Time: {:.1}s",
                outcome.attempts,
                outcome.final_verdict,
                outcome.documents.len(),
                outcome.total_tokens,
                outcome.elapsed.as_secs_f64()
            );
            output
        }
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(outcome),
    }
}

/// Formats the eval summary line.
#[must_use]
pub fn format_eval_summary(
    summary: &EvalSummary,
    results_path: &std::path::Path,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => format!("{summary}\nResults saved to {}", results_path.display()),
        OutputFormat::Json | OutputFormat::Ndjson => format.to_json(&serde_json::json!({
            "summary": summary,
            "results_path": results_path.to_string_lossy(),
        })),
    }
}
