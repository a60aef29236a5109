//! Step-by-step progress lines for interactive sessions.

use std::io::Write;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::agent::{LoopEvent, Phase};

/// Renders one loop event as a progress line, if it has one.
#[must_use]
pub fn describe(event: &LoopEvent) -> Option<String> {
    match event {
        LoopEvent::PhaseEntered { phase, attempt } => match phase {
            Phase::Retrieving => Some(format!(
                "--- [Retrieve] Searching knowledge base (attempt {attempt}) ---"
            )),
            Phase::Generating => Some("--- [Generate] Synthesizing answer ---".to_string()),
            Phase::Reflecting => Some("--- [Reflect] Critiquing answer ---".to_string()),
            Phase::Retrying | Phase::Done => None,
        },
        LoopEvent::Retrieved { documents, .. } => {
            Some(format!("    {documents} document(s) retrieved"))
        }
        LoopEvent::Generated { .. } => None,
        LoopEvent::Reflected {
            verdict, critique, ..
        } => Some(format!("    critic: {verdict} ({})", critique.trim())),
        LoopEvent::Rejected { attempt } => Some(format!(
            "--- Rejected (attempt {attempt}). Searching again... ---"
        )),
        LoopEvent::Finished { attempts, verdict } => Some(format!(
            "--- Done after {attempts} attempt(s): {verdict} ---"
        )),
    }
}

/// Writes a line for every event until the sender side closes.
///
/// Write failures are ignored; progress never affects the session.
pub async fn report<W: Write>(mut events: UnboundedReceiver<LoopEvent>, out: &mut W) {
    while let Some(event) = events.recv().await {
        if let Some(line) = describe(&event) {
            let _ = writeln!(out, "{line}");
        }
    }
    let _ = out.flush();
}
