//! Interactive chat loop.

use std::io::{self, BufRead, Write};

use crate::agent::SessionOutcome;
use crate::error::AgentError;

const QUIT_WORDS: [&str; 4] = ["quit", "exit", "bye", "q"];

/// Counts for a finished chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatStats {
    /// Questions answered.
    pub answered: usize,
    /// Questions whose session failed.
    pub failed: usize,
}

/// Returns `true` if `line` ends the chat.
#[must_use]
pub fn is_quit(line: &str) -> bool {
    let word = line.trim();
    QUIT_WORDS.iter().any(|q| q.eq_ignore_ascii_case(word))
}

/// Reads questions from `input` until a quit word or end of input.
///
/// Each question goes to `ask`. A failed session prints an error line and
/// the loop continues. Blank lines are skipped.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub fn chat_loop<R, W, F>(input: R, output: &mut W, mut ask: F) -> io::Result<ChatStats>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> Result<SessionOutcome, AgentError>,
{
    writeln!(output, "{}", "=".repeat(50))?;
    writeln!(output, "DOCUMENT QA AGENT")?;
    writeln!(output, "{}", "=".repeat(50))?;

    let mut stats = ChatStats::default();
    let mut lines = input.lines();

    loop {
        write!(output, "\nUser: ")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            break;
        };
        if is_quit(&line) {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match ask(question) {
            Ok(outcome) => {
                stats.answered += 1;
                writeln!(output, "\nAgent: {}", outcome.answer)?;
            }
            Err(e) => {
                stats.failed += 1;
                writeln!(output, "\nAn error occurred during processing: {e}")?;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SessionState;
    use crate::core::Verdict;
    use std::time::Duration;
    use test_case::test_case;

    fn answer(question: &str) -> Result<SessionOutcome, AgentError> {
        if question.contains("boom") {
            return Err(AgentError::Timeout {
                operation: "chat",
                seconds: 120,
            }
            .for_session(question));
        }
        Ok(SessionState::new(question)
            .with_answer(format!("re: {question}"))
            .with_verdict(Verdict::Satisfactory)
            .into_outcome(0, Duration::ZERO))
    }

    #[test_case("quit" ; "quit")]
    #[test_case("EXIT" ; "upper exit")]
    #[test_case("  Bye " ; "padded bye")]
    #[test_case("q" ; "q")]
    fn test_is_quit(line: &str) {
        assert!(is_quit(line));
    }

    #[test]
    fn test_is_quit_rejects_questions() {
        assert!(!is_quit("quite a question"));
        assert!(!is_quit(""));
    }

    #[test]
    fn test_chat_loop_answers_until_quit() {
        let input = "first\n\nboom now\nsecond\nquit\nnever asked\n".as_bytes();
        let mut output = Vec::new();
        let mut asked = Vec::new();

        let stats = chat_loop(input, &mut output, |q| {
            asked.push(q.to_string());
            answer(q)
        })
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(asked, vec!["first", "boom now", "second"]);
        assert_eq!(stats, ChatStats { answered: 2, failed: 1 });

        let text = String::from_utf8(output).unwrap_or_default();
        assert!(text.contains("Agent: re: first"));
        assert!(text.contains("Agent: re: second"));
        assert!(text.contains("An error occurred during processing: session failed for question 'boom now'"));
        assert!(!text.contains("never asked"));
    }

    #[test]
    fn test_chat_loop_ends_at_eof() {
        let mut output = Vec::new();
        let stats = chat_loop("only\n".as_bytes(), &mut output, answer)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(stats.answered, 1);
    }
}
