//! Retrieve → generate → reflect loop with bounded quality retries.
//!
//! ```text
//! Retrieving ─► Generating ─► Reflecting ─┬─► Done
//!      ▲                                  │
//!      └────────────── Retrying ◄─────────┘
//! ```
//!
//! Retrieval failures are absorbed by the [`Retriever`]. Generation and
//! critique failures abort the session; they never consume an attempt and
//! are never retried here.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::config::AgentConfig;
use super::critic::CriticAgent;
use super::generator::GeneratorAgent;
use super::policy::RetryPolicy;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::retriever::Retriever;
use super::state::{Phase, SessionOutcome, SessionState};
use crate::core::Verdict;
use crate::error::AgentError;

/// Longest accepted question, in bytes.
const MAX_QUESTION_LEN: usize = 10_000;

/// Progress notification emitted by [`AgentLoop::run_with_events`].
///
/// `attempt` is the 1-based cycle the event belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// The loop entered a phase.
    PhaseEntered {
        /// Phase entered.
        phase: Phase,
        /// Current cycle.
        attempt: u32,
    },
    /// Retrieval finished.
    Retrieved {
        /// Current cycle.
        attempt: u32,
        /// Number of documents retrieved.
        documents: usize,
    },
    /// Generation finished.
    Generated {
        /// Current cycle.
        attempt: u32,
        /// Generated answer.
        answer: String,
    },
    /// Critique finished and the attempt was counted.
    Reflected {
        /// Completed cycle.
        attempt: u32,
        /// Critic verdict.
        verdict: Verdict,
        /// Critic reply as returned by the model.
        critique: String,
    },
    /// The answer was rejected and another cycle starts.
    Rejected {
        /// Rejected cycle.
        attempt: u32,
    },
    /// The session ended.
    Finished {
        /// Completed cycles.
        attempts: u32,
        /// Verdict on the final answer.
        verdict: Verdict,
    },
}

/// Answers one question per [`run`](Self::run) call.
///
/// Holds only read-only collaborators, so one instance can serve many
/// concurrent sessions; each session owns its [`SessionState`].
pub struct AgentLoop {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    generator: GeneratorAgent,
    critic: CriticAgent,
    policy: RetryPolicy,
}

impl AgentLoop {
    /// Creates a loop with prompts loaded from [`AgentConfig::prompt_dir`],
    /// falling back to compiled-in defaults.
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Retriever, config: &AgentConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, retriever, config, prompts)
    }

    /// Creates a loop with an explicit prompt set.
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        retriever: Retriever,
        config: &AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        Self {
            provider,
            retriever,
            generator: GeneratorAgent::new(config, prompts.generator),
            critic: CriticAgent::new(config, prompts.critic),
            policy: RetryPolicy::new(config.max_attempts),
        }
    }

    /// The retry policy in effect.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// The retriever in use.
    #[must_use]
    pub const fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Runs a session for `question`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyQuestion`] or [`AgentError::QuestionTooLong`]
    /// for invalid input, and [`AgentError::Session`] when generation or
    /// critique fails.
    pub async fn run(&self, question: &str) -> Result<SessionOutcome, AgentError> {
        self.run_with_events(question, None).await
    }

    /// Runs a session, sending a [`LoopEvent`] after every transition.
    ///
    /// Events are best effort: a closed receiver does not affect the session.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub async fn run_with_events(
        &self,
        question: &str,
        events: Option<&UnboundedSender<LoopEvent>>,
    ) -> Result<SessionOutcome, AgentError> {
        validate_question(question)?;

        let start = Instant::now();
        let mut state = SessionState::new(question);
        let mut phase = Phase::Retrieving;
        let mut total_tokens: u32 = 0;

        while phase != Phase::Done {
            let attempt = state.attempts().saturating_add(1);
            emit(events, LoopEvent::PhaseEntered { phase, attempt });

            phase = match phase {
                Phase::Retrieving => {
                    debug!(attempt, "retrieve: searching knowledge base");
                    let documents = self.retriever.retrieve(state.question()).await;
                    emit(
                        events,
                        LoopEvent::Retrieved {
                            attempt,
                            documents: documents.len(),
                        },
                    );
                    state = state.with_documents(documents);
                    Phase::Generating
                }
                Phase::Generating => {
                    debug!(attempt, "generate: synthesizing answer");
                    let response = self
                        .generator
                        .generate(&*self.provider, state.question(), state.documents())
                        .await
                        .map_err(|e| e.for_session(question))?;
                    total_tokens = total_tokens.saturating_add(response.usage.total_tokens);
                    emit(
                        events,
                        LoopEvent::Generated {
                            attempt,
                            answer: response.content.clone(),
                        },
                    );
                    state = state.with_answer(response.content);
                    Phase::Reflecting
                }
                Phase::Reflecting => {
                    debug!(attempt, "reflect: critiquing answer");
                    let critique = self
                        .critic
                        .critique(
                            &*self.provider,
                            state.question(),
                            state.answer().unwrap_or_default(),
                        )
                        .await
                        .map_err(|e| e.for_session(question))?;
                    total_tokens = total_tokens.saturating_add(critique.usage.total_tokens);
                    let verdict = critique.verdict;
                    state = state.with_verdict(verdict);
                    emit(
                        events,
                        LoopEvent::Reflected {
                            attempt: state.attempts(),
                            verdict,
                            critique: critique.raw,
                        },
                    );

                    let next = self.policy.decide(verdict, state.attempts());
                    if next == Phase::Retrying {
                        info!(
                            attempt = state.attempts(),
                            max_attempts = self.policy.max_attempts(),
                            "answer rejected; searching again"
                        );
                        emit(
                            events,
                            LoopEvent::Rejected {
                                attempt: state.attempts(),
                            },
                        );
                    }
                    next
                }
                Phase::Retrying => Phase::Retrieving,
                Phase::Done => Phase::Done,
            };
        }

        let outcome = state.into_outcome(total_tokens, start.elapsed());
        emit(
            events,
            LoopEvent::Finished {
                attempts: outcome.attempts,
                verdict: outcome.final_verdict,
            },
        );
        info!(
            attempts = outcome.attempts,
            verdict = %outcome.final_verdict,
            documents = outcome.documents.len(),
            total_tokens,
            "session complete"
        );
        Ok(outcome)
    }
}

fn validate_question(question: &str) -> Result<(), AgentError> {
    if question.trim().is_empty() {
        return Err(AgentError::EmptyQuestion);
    }
    if question.len() > MAX_QUESTION_LEN {
        return Err(AgentError::QuestionTooLong {
            len: question.len(),
            max: MAX_QUESTION_LEN,
        });
    }
    Ok(())
}

fn emit(events: Option<&UnboundedSender<LoopEvent>>, event: LoopEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("provider", &self.provider.name())
            .field("retriever", &self.retriever)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::core::Document;
    use crate::error::IndexError;
    use crate::index::DocumentSearch;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use proptest::prelude::*;

    const GENERATOR_PROMPT: &str = "GENERATOR";
    const CRITIC_PROMPT: &str = "CRITIC";

    /// Provider that answers generator calls by echoing the context and
    /// critic calls from a script. Once the script runs out the critic
    /// keeps replying `needs_revision`.
    struct ScriptedProvider {
        critiques: Mutex<VecDeque<&'static str>>,
        generator_inputs: Mutex<Vec<String>>,
        critic_calls: AtomicUsize,
        fail_generation_on: Option<usize>,
    }

    impl ScriptedProvider {
        fn new(critiques: &[&'static str]) -> Self {
            Self {
                critiques: Mutex::new(critiques.iter().copied().collect()),
                generator_inputs: Mutex::new(Vec::new()),
                critic_calls: AtomicUsize::new(0),
                fail_generation_on: None,
            }
        }

        fn failing_generation_on(mut self, call: usize) -> Self {
            self.fail_generation_on = Some(call);
            self
        }

        fn generator_inputs(&self) -> Vec<String> {
            self.generator_inputs
                .lock()
                .map(|g| g.clone())
                .unwrap_or_default()
        }

        fn critic_calls(&self) -> usize {
            self.critic_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let user = request.last_user_content().unwrap_or_default().to_string();
            let usage = TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            };

            let content = match request.messages[0].content.as_str() {
                GENERATOR_PROMPT => {
                    let call = {
                        let mut inputs = self
                            .generator_inputs
                            .lock()
                            .unwrap_or_else(|_| panic!("lock poisoned"));
                        inputs.push(user.clone());
                        inputs.len()
                    };
                    if self.fail_generation_on == Some(call) {
                        return Err(AgentError::ApiRequest {
                            message: "rate limit exceeded".to_string(),
                            status: Some(429),
                        });
                    }
                    if user.contains("randomized controlled trial") {
                        "The main methodology is a randomized controlled trial.".to_string()
                    } else if user.contains("<context>\n\n</context>") {
                        "I don't have enough information to answer.".to_string()
                    } else {
                        format!("answer #{call}")
                    }
                }
                CRITIC_PROMPT => {
                    self.critic_calls.fetch_add(1, Ordering::SeqCst);
                    self.critiques
                        .lock()
                        .ok()
                        .and_then(|mut c| c.pop_front())
                        .unwrap_or("needs_revision")
                        .to_string()
                }
                other => panic!("unexpected system prompt: {other}"),
            };

            Ok(ChatResponse {
                content,
                usage,
                finish_reason: Some("stop".to_string()),
            })
        }
    }

    /// Search backend returning a distinct document per call.
    struct CountingSearch {
        calls: AtomicUsize,
        per_call: Vec<Vec<&'static str>>,
    }

    impl CountingSearch {
        fn new(per_call: Vec<Vec<&'static str>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                per_call,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentSearch for CountingSearch {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<Document>, IndexError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let docs = self
                .per_call
                .get(call)
                .or_else(|| self.per_call.last())
                .map(|batch| batch.iter().take(top_k).map(|s| Document::new(*s)).collect())
                .unwrap_or_default();
            Ok(docs)
        }
    }

    fn config(max_attempts: u32) -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .max_attempts(max_attempts)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    fn prompts() -> PromptSet {
        PromptSet {
            generator: GENERATOR_PROMPT.to_string(),
            critic: CRITIC_PROMPT.to_string(),
        }
    }

    fn build(
        provider: &Arc<ScriptedProvider>,
        search: &Arc<CountingSearch>,
        max_attempts: u32,
    ) -> AgentLoop {
        AgentLoop::with_prompts(
            Arc::clone(provider) as Arc<dyn LlmProvider>,
            Retriever::new(Arc::clone(search) as Arc<dyn DocumentSearch>, 10),
            &config(max_attempts),
            prompts(),
        )
    }

    #[tokio::test]
    async fn test_never_satisfied_stops_after_three_attempts() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
        let agent = build(&provider, &search, 3);

        let outcome = agent
            .run("Who is the author?")
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.final_verdict, Verdict::NeedsRevision);
        assert_eq!(search.calls(), 3);
        assert_eq!(provider.generator_inputs().len(), 3);
        assert_eq!(provider.critic_calls(), 3);
        assert_eq!(outcome.total_tokens, 6 * 15);
    }

    #[tokio::test]
    async fn test_satisfied_on_attempt_k_stops_immediately() {
        for k in 1..=3_usize {
            let mut script = vec!["needs_revision"; k - 1];
            script.push("accurate");
            let provider = Arc::new(ScriptedProvider::new(&script));
            let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
            let agent = build(&provider, &search, 3);

            let outcome = agent
                .run("What are the key results?")
                .await
                .unwrap_or_else(|e| panic!("run failed: {e}"));

            assert_eq!(outcome.attempts, u32::try_from(k).unwrap_or(0));
            assert_eq!(outcome.final_verdict, Verdict::Satisfactory);
            assert_eq!(search.calls(), k, "no retrieval after approval");
            assert_eq!(provider.generator_inputs().len(), k);
            assert_eq!(provider.critic_calls(), k);
        }
    }

    #[tokio::test]
    async fn test_missing_index_still_answers() {
        let provider = Arc::new(ScriptedProvider::new(&["accurate"]));
        let agent = AgentLoop::with_prompts(
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            Retriever::unavailable(10),
            &config(3),
            prompts(),
        );

        let outcome = agent
            .run("Who is the author of the paper?")
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        let inputs = provider.generator_inputs();
        assert_eq!(inputs.len(), 1);
        assert!(inputs[0].contains("<context>\n\n</context>"));
        assert!(outcome.documents.is_empty());
        assert!(outcome.answer.contains("don't have enough information"));
    }

    #[tokio::test]
    async fn test_retry_uses_only_latest_documents() {
        let provider = Arc::new(ScriptedProvider::new(&["needs_revision", "accurate"]));
        let search = Arc::new(CountingSearch::new(vec![
            vec!["stale-alpha", "stale-beta"],
            vec!["fresh-gamma"],
        ]));
        let agent = build(&provider, &search, 3);

        let outcome = agent
            .run("q")
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        let inputs = provider.generator_inputs();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].contains("stale-alpha"));
        assert!(inputs[1].contains("fresh-gamma"));
        assert!(!inputs[1].contains("stale"));
        assert_eq!(outcome.documents, vec![Document::new("fresh-gamma")]);
        assert_eq!(outcome.answer, "answer #2");
    }

    #[tokio::test]
    async fn test_methodology_scenario() {
        let provider = Arc::new(ScriptedProvider::new(&["needs_revision", "accurate"]));
        let search = Arc::new(CountingSearch::new(vec![vec![
            "Methodology: randomized controlled trial",
            "Section 2. Methodology: randomized controlled trial with 400 participants",
        ]]));
        let agent = build(&provider, &search, 3);

        let outcome = agent
            .run("What is the main methodology?")
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.final_verdict, Verdict::Satisfactory);
        assert!(outcome.answer.contains("randomized controlled trial"));
        assert_eq!(outcome.documents.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_aborts_session() {
        let provider =
            Arc::new(ScriptedProvider::new(&["needs_revision"]).failing_generation_on(2));
        let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
        let agent = build(&provider, &search, 3);

        match agent.run("What are the key results?").await {
            Err(AgentError::Session { question, source }) => {
                assert_eq!(question, "What are the key results?");
                assert!(matches!(
                    *source,
                    AgentError::ApiRequest {
                        status: Some(429),
                        ..
                    }
                ));
            }
            Err(other) => panic!("expected Session error, got {other}"),
            Ok(outcome) => panic!("expected failure, got {outcome:?}"),
        }
        assert_eq!(provider.critic_calls(), 1, "no critique after failure");
        assert_eq!(search.calls(), 2);
    }

    #[tokio::test]
    async fn test_rejects_invalid_questions() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let search = Arc::new(CountingSearch::new(vec![]));
        let agent = build(&provider, &search, 3);

        assert!(matches!(
            agent.run("   ").await,
            Err(AgentError::EmptyQuestion)
        ));
        let long = "x".repeat(MAX_QUESTION_LEN + 1);
        assert!(matches!(
            agent.run(&long).await,
            Err(AgentError::QuestionTooLong { .. })
        ));
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_events_follow_transition_table() {
        let provider = Arc::new(ScriptedProvider::new(&["needs_revision", "accurate"]));
        let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
        let agent = build(&provider, &search, 3);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        agent
            .run_with_events("q", Some(&tx))
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));
        drop(tx);

        let mut phases = Vec::new();
        let mut verdicts = Vec::new();
        let mut rejected = Vec::new();
        let mut critiques = Vec::new();
        let mut finished = None;
        while let Some(event) = rx.recv().await {
            match event {
                LoopEvent::PhaseEntered { phase, .. } => phases.push(phase),
                LoopEvent::Reflected {
                    attempt,
                    verdict,
                    critique,
                } => {
                    verdicts.push((attempt, verdict));
                    critiques.push(critique);
                }
                LoopEvent::Rejected { attempt } => rejected.push(attempt),
                LoopEvent::Finished { attempts, verdict } => finished = Some((attempts, verdict)),
                LoopEvent::Retrieved { .. } | LoopEvent::Generated { .. } => {}
            }
        }

        assert_eq!(
            phases,
            vec![
                Phase::Retrieving,
                Phase::Generating,
                Phase::Reflecting,
                Phase::Retrying,
                Phase::Retrieving,
                Phase::Generating,
                Phase::Reflecting,
            ]
        );
        assert_eq!(
            verdicts,
            vec![(1, Verdict::NeedsRevision), (2, Verdict::Satisfactory)]
        );
        assert_eq!(critiques, vec!["needs_revision", "accurate"]);
        assert_eq!(rejected, vec![1]);
        assert_eq!(finished, Some((2, Verdict::Satisfactory)));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
        let agent = build(&provider, &search, 2);

        let (a, b) = tokio::join!(agent.run("first question"), agent.run("second question"));
        let a = a.unwrap_or_else(|e| panic!("first failed: {e}"));
        let b = b.unwrap_or_else(|e| panic!("second failed: {e}"));

        assert_eq!(a.attempts, 2);
        assert_eq!(b.attempts, 2);
        assert_eq!(provider.critic_calls(), 4);
    }

    proptest! {
        #[test]
        fn prop_attempts_bounded_by_policy(
            script in prop::collection::vec(prop::bool::ANY, 0..8),
            max_attempts in 1_u32..6,
        ) {
            let critiques: Vec<&'static str> = script
                .iter()
                .map(|ok| if *ok { "accurate" } else { "needs_revision" })
                .collect();
            let expected = script
                .iter()
                .position(|ok| *ok)
                .map_or(max_attempts, |i| {
                    u32::try_from(i + 1).unwrap_or(u32::MAX).min(max_attempts)
                });

            let provider = Arc::new(ScriptedProvider::new(&critiques));
            let search = Arc::new(CountingSearch::new(vec![vec!["doc"]]));
            let agent = build(&provider, &search, max_attempts);

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap_or_else(|e| panic!("runtime: {e}"));
            let outcome = rt
                .block_on(agent.run("q"))
                .unwrap_or_else(|e| panic!("run failed: {e}"));

            prop_assert_eq!(outcome.attempts, expected);
            prop_assert_eq!(provider.critic_calls(), expected as usize);
            prop_assert!(outcome.attempts <= max_attempts);
        }
    }
}
