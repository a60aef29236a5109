//! Critic verdict for a generated answer.
//!
//! Lives in `core` so the agent loop, evaluation harness, and CLI output
//! share one classification rule.

use serde::{Deserialize, Serialize};

/// Token whose presence marks a critique as satisfactory.
pub const SATISFACTORY_TOKEN: &str = "accurate";

/// Binary quality classification of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// The answer is accepted; the loop stops.
    Satisfactory,
    /// The answer is rejected; the loop retries if attempts remain.
    NeedsRevision,
}

impl Verdict {
    /// Classifies a raw critic response.
    ///
    /// Satisfactory if and only if the text contains `"accurate"` in any
    /// case, anywhere. Everything else, including empty or malformed output,
    /// is `NeedsRevision`.
    ///
    /// Known false positive: a plain substring match means responses such as
    /// `"not accurate"` or `"inaccurate"` classify as satisfactory. The rule
    /// is kept as-is for compatibility with existing critic prompts.
    #[must_use]
    pub fn from_critique(response: &str) -> Self {
        if response.to_lowercase().contains(SATISFACTORY_TOKEN) {
            Self::Satisfactory
        } else {
            Self::NeedsRevision
        }
    }

    /// Returns `true` for [`Verdict::Satisfactory`].
    #[must_use]
    pub const fn is_satisfactory(self) -> bool {
        matches!(self, Self::Satisfactory)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Satisfactory => "satisfactory",
            Self::NeedsRevision => "needs_revision",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
