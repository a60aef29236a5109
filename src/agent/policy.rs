//! Quality-driven retry policy.

use super::config::DEFAULT_MAX_ATTEMPTS;
use super::state::Phase;
use crate::core::Verdict;

/// Decides whether a reflected answer ends the session.
///
/// Evaluated after the attempt counter has been incremented. The `>=`
/// comparison caps a session at `max_attempts` completed cycles even
/// against a critic that never approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Creates a policy allowing at most `max_attempts` completed cycles.
    ///
    /// A value of zero behaves like one: the first cycle always completes.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Maximum completed cycles.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Next phase after reflection: `Done` or `Retrying`.
    #[must_use]
    pub const fn decide(&self, verdict: Verdict, attempts: u32) -> Phase {
        if verdict.is_satisfactory() || attempts >= self.max_attempts {
            Phase::Done
        } else {
            Phase::Retrying
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
