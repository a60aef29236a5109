//! Session state threaded through the agent loop.
//!
//! Each step consumes the state and returns the full next state, so a
//! field can only change through the method that owns it.

use std::time::Duration;

use serde::Serialize;

use crate::core::{Document, Verdict};

/// Phase of the retrieve → generate → reflect state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Fetching context documents.
    Retrieving,
    /// Producing an answer from the latest documents.
    Generating,
    /// Critiquing the latest answer and applying the retry policy.
    Reflecting,
    /// Rejected answer with attempts left; next phase is `Retrieving`.
    Retrying,
    /// Terminal.
    Done,
}

impl Phase {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Reflecting => "reflecting",
            Self::Retrying => "retrying",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one question's session.
///
/// Created fresh per question and discarded when the loop ends. The
/// question never changes; documents and answer are overwritten on every
/// cycle; verdict and attempt counter always change together.
#[derive(Debug, Clone)]
pub struct SessionState {
    question: String,
    documents: Vec<Document>,
    answer: Option<String>,
    verdict: Option<Verdict>,
    attempts: u32,
}

impl SessionState {
    /// Starts a session for `question` with no attempts.
    #[must_use]
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            documents: Vec::new(),
            answer: None,
            verdict: None,
            attempts: 0,
        }
    }

    /// The user's question.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Documents from the most recent retrieval.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Most recent answer, if generation has run.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Most recent verdict, if reflection has run.
    #[must_use]
    pub const fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// Completed reflect cycles.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Replaces the documents with a new retrieval.
    #[must_use]
    pub fn with_documents(self, documents: Vec<Document>) -> Self {
        Self { documents, ..self }
    }

    /// Replaces the answer with a new generation.
    #[must_use]
    pub fn with_answer(self, answer: String) -> Self {
        Self {
            answer: Some(answer),
            ..self
        }
    }

    /// Records a verdict and counts the completed cycle.
    #[must_use]
    pub fn with_verdict(self, verdict: Verdict) -> Self {
        Self {
            verdict: Some(verdict),
            attempts: self.attempts.saturating_add(1),
            ..self
        }
    }

    /// Consumes the terminal state into the caller-facing result.
    #[must_use]
    pub fn into_outcome(self, total_tokens: u32, elapsed: Duration) -> SessionOutcome {
        SessionOutcome {
            answer: self.answer.unwrap_or_default(),
            attempts: self.attempts,
            final_verdict: self.verdict.unwrap_or(Verdict::NeedsRevision),
            documents: self.documents,
            total_tokens,
            elapsed,
        }
    }
}

/// Result of a completed session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    /// Final answer.
    pub answer: String,
    /// Completed reflect cycles.
    pub attempts: u32,
    /// Verdict on the final answer.
    pub final_verdict: Verdict,
    /// Documents used for the final answer.
    pub documents: Vec<Document>,
    /// Tokens consumed by generation and critique.
    pub total_tokens: u32,
    /// Wall time for the session.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
