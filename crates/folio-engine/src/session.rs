//! Chat session facade.
//!
//! A [`ChatSession`] owns one conversation: the running message history,
//! the delta ledger, and the turn state. It wires the orchestrator,
//! executor, store and persistence backend into the three user-facing
//! operations: [`send_message`](ChatSession::send_message),
//! [`undo_action`](ChatSession::undo_action) and
//! [`continue_with_user_response`](ChatSession::continue_with_user_response).
//!
//! Turns are serialized by `&mut self`. A failed turn commits nothing.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};

use folio_core::{generate_id, today, Portfolio};
use folio_llm::{ChatMessage, ChatModel, CompletionOptions};
use folio_settings::{EngineSettings, LlmSettings};

use crate::delta::{apply_in_reverse, Delta};
use crate::errors::{EngineError, Result};
use crate::executor::{apply_actions, Execution, ExecutionContext};
use crate::ledger::{ActionResult, Ledger};
use crate::orchestrator::{RetryOrchestrator, DEFAULT_MAX_ATTEMPTS};
use crate::persistence::{inverse_op, persist_all, Persistence, PersistOp};
use crate::prompt::system_prompt;
use crate::state::TurnState;
use crate::store::{PortfolioStore, Snapshot};

/// Session tuning.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Model attempts per turn.
    pub max_attempts: u32,
    /// Activity entries per project in the prompt.
    pub context_activity_limit: usize,
    /// Author for comments that do not name one.
    pub default_author: String,
    /// Conversation messages kept for replay.
    pub history_limit: usize,
    /// Options passed on every model call.
    pub completion: CompletionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            context_activity_limit: 3,
            default_author: "AI Assistant".to_string(),
            history_limit: 20,
            completion: CompletionOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Build from loaded settings.
    pub fn from_settings(engine: &EngineSettings, llm: &LlmSettings) -> Self {
        Self {
            max_attempts: engine.max_attempts,
            context_activity_limit: engine.context_activity_limit,
            default_author: engine.default_author.clone(),
            history_limit: engine.history_limit,
            completion: CompletionOptions {
                temperature: llm.temperature,
                max_tokens: None,
                json_response: llm.json_response_format,
            },
        }
    }
}

/// Outcome of a turn as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStatus {
    /// Reply shown; any actions were applied.
    Completed,
    /// The model asked a question; nothing was applied.
    AwaitingUser,
    /// The turn failed; nothing was applied.
    Failed,
}

/// An assistant reply.
#[derive(Clone, Debug, PartialEq)]
pub struct AssistantMessage {
    /// Id used with [`ChatSession::undo_action`].
    pub id: String,
    /// Text to display.
    pub text: String,
    /// Turn outcome.
    pub status: MessageStatus,
    /// One result per applied action, in submission order.
    pub results: Vec<ActionResult>,
    /// Clarifying question, for [`MessageStatus::AwaitingUser`].
    pub question: Option<String>,
    /// Model attempts used. Zero when the first call failed.
    pub attempts: u32,
    /// Error text, for [`MessageStatus::Failed`].
    pub error: Option<String>,
    /// Store version after the turn.
    pub version: u64,
}

/// One conversation against one portfolio store.
pub struct ChatSession {
    model: Arc<dyn ChatModel>,
    store: Arc<dyn PortfolioStore>,
    persistence: Arc<dyn Persistence>,
    config: SessionConfig,
    ledger: Ledger,
    history: VecDeque<ChatMessage>,
    state: TurnState,
}

impl ChatSession {
    /// Create a session.
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<dyn PortfolioStore>,
        persistence: Arc<dyn Persistence>,
        config: SessionConfig,
    ) -> Self {
        Self {
            model,
            store,
            persistence,
            config,
            ledger: Ledger::new(),
            history: VecDeque::new(),
            state: TurnState::Idle,
        }
    }

    /// Current turn state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The delta ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Current results for a message, including `undone` flags.
    pub fn action_results(&self, message_id: &str) -> Option<&[ActionResult]> {
        self.ledger.results(message_id)
    }

    /// Conversation replayed to the model, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    /// Copy of the live portfolio.
    pub fn portfolio(&self) -> Portfolio {
        self.store.snapshot().portfolio
    }

    /// Run a full turn for `text`: prompt, validate, apply, commit.
    pub async fn send_message(&mut self, text: &str) -> Result<AssistantMessage> {
        self.run_turn(text).await
    }

    /// Answer a clarifying question and run the resulting turn.
    pub async fn continue_with_user_response(&mut self, text: &str) -> Result<AssistantMessage> {
        if self.state != TurnState::AwaitingUser {
            debug!(state = %self.state, "no pending question, handling as a new message");
        }
        self.run_turn(text).await
    }

    /// Undo one action of a past message.
    ///
    /// Returns `false` when there was nothing to undo (already undone,
    /// skipped action, or index out of range). Unknown message ids are an
    /// error.
    pub async fn undo_action(&mut self, message_id: &str, action_index: usize) -> Result<bool> {
        let Some(deltas) = self.ledger.undo_deltas(message_id, action_index)? else {
            return Ok(false);
        };

        let mut snapshot = self.store.snapshot();
        let applied = apply_in_reverse(&mut snapshot.portfolio, &deltas);
        let restored = snapshot.portfolio.clone();
        let version = self.store.commit(snapshot)?;
        self.ledger.mark_undone(message_id, action_index);
        info!(message_id, action_index, deltas = deltas.len(), applied, version, "action rolled back");

        let ops = rollback_ops(&deltas, &restored);
        let failures = persist_all(self.persistence.as_ref(), &ops).await;
        if failures > 0 {
            warn!(message_id, action_index, failures, "some rollbacks were not persisted");
        }
        Ok(true)
    }

    async fn run_turn(&mut self, text: &str) -> Result<AssistantMessage> {
        let message_id = generate_id("msg");
        let snapshot = self.store.snapshot();

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(system_prompt(
            &snapshot.portfolio,
            self.config.context_activity_limit,
            &today(),
        )));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(text));

        let orchestrator = RetryOrchestrator::new(
            self.model.as_ref(),
            &self.config.completion,
            self.config.max_attempts,
        );
        let outcome = orchestrator
            .request_actions(messages, &snapshot.portfolio, &mut self.state)
            .await;

        let turn = match outcome {
            Ok(turn) => turn,
            Err(e @ (EngineError::RetriesExhausted { .. } | EngineError::Provider(_))) => {
                let attempts = match &e {
                    EngineError::RetriesExhausted { attempts, .. } => *attempts,
                    _ => 0,
                };
                self.state.transition(TurnState::Idle);
                return Ok(AssistantMessage {
                    id: message_id,
                    text: format!("Sorry, I couldn't complete that request: {e}"),
                    status: MessageStatus::Failed,
                    results: Vec::new(),
                    question: None,
                    attempts,
                    error: Some(e.to_string()),
                    version: snapshot.version,
                });
            }
            Err(e) => {
                self.state.transition(TurnState::Idle);
                return Err(e);
            }
        };

        if let Some(question) = turn.question {
            self.remember(text, &turn.display_text);
            self.state.transition(TurnState::AwaitingUser);
            return Ok(AssistantMessage {
                id: message_id,
                text: turn.display_text,
                status: MessageStatus::AwaitingUser,
                results: Vec::new(),
                question: Some(question),
                attempts: turn.attempts,
                error: None,
                version: snapshot.version,
            });
        }

        let ctx = ExecutionContext::now(self.config.default_author.clone());
        let Execution {
            working,
            results,
            ops,
        } = apply_actions(&snapshot.portfolio, &turn.actions, &ctx);
        let changed = results.iter().any(|r| !r.deltas.is_empty());

        let mut version = snapshot.version;
        if changed {
            let commit = self.store.commit(Snapshot {
                version: snapshot.version,
                portfolio: working,
            });
            version = match commit {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "commit rejected, discarding batch");
                    self.state.transition(TurnState::Failed);
                    self.state.transition(TurnState::Idle);
                    return Err(e);
                }
            };
        }
        self.state.transition(TurnState::Committed);
        info!(
            message_id = %message_id,
            actions = results.len(),
            attempts = turn.attempts,
            version,
            "turn complete"
        );

        self.ledger.record(&message_id, results.clone());
        let failures = persist_all(self.persistence.as_ref(), &ops).await;
        if failures > 0 {
            warn!(failures, "some changes were not persisted");
        }

        self.remember(text, &turn.display_text);
        self.state.transition(TurnState::Idle);

        Ok(AssistantMessage {
            id: message_id,
            text: turn.display_text,
            status: MessageStatus::Completed,
            results,
            question: None,
            attempts: turn.attempts,
            error: None,
            version,
        })
    }

    fn remember(&mut self, user: &str, assistant: &str) {
        self.history.push_back(ChatMessage::user(user));
        self.history.push_back(ChatMessage::assistant(assistant));
        while self.history.len() > self.config.history_limit {
            let _ = self.history.pop_front();
        }
    }
}

/// Persistence calls for a rollback, in the order the deltas were applied.
fn rollback_ops(deltas: &[Delta], restored: &Portfolio) -> Vec<PersistOp> {
    deltas
        .iter()
        .rev()
        .filter_map(|d| inverse_op(d, restored))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use folio_core::{Project, Task, WorkStatus};
    use folio_llm::{ChatRole, ScriptedModel};

    use super::*;
    use crate::persistence::NoopPersistence;
    use crate::store::InMemoryStore;

    fn portfolio() -> Portfolio {
        let mut project = Project::new("p1", "Alpha");
        project.plan.push(Task {
            id: "t1".into(),
            title: "Design".into(),
            status: WorkStatus::Todo,
            due_date: None,
            completed_date: None,
            subtasks: Vec::new(),
        });
        Portfolio::new(vec![project])
    }

    fn session(replies: &[&str], config: SessionConfig) -> (ChatSession, Arc<ScriptedModel>, Arc<InMemoryStore>) {
        let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
        let store = Arc::new(InMemoryStore::new(portfolio()));
        let session = ChatSession::new(
            model.clone(),
            store.clone(),
            Arc::new(NoopPersistence),
            config,
        );
        (session, model, store)
    }

    #[tokio::test]
    async fn history_is_bounded_and_replayed() {
        let config = SessionConfig {
            history_limit: 2,
            ..Default::default()
        };
        let (mut session, model, _) = session(&["one", "two"], config);
        let _ = session.send_message("first").await.unwrap();
        let _ = session.send_message("second").await.unwrap();

        let history: Vec<_> = session.history().map(|m| m.content.clone()).collect();
        assert_eq!(history, vec!["second", "two"]);

        // Second request: system, replayed user/assistant, new user.
        let requests = model.requests();
        let second = &requests[1];
        assert_eq!(second[0].role, ChatRole::System);
        assert_eq!(second[1].content, "first");
        assert_eq!(second[2].content, "one");
        assert_eq!(second[3].content, "second");
    }

    #[tokio::test]
    async fn no_op_turn_does_not_bump_version() {
        let (mut session, _, store) = session(&["Looks fine."], SessionConfig::default());
        let message = session.send_message("status?").await.unwrap();
        assert_eq!(message.status, MessageStatus::Completed);
        assert!(message.results.is_empty());
        assert_eq!(store.version(), 0);
        assert_eq!(session.state(), TurnState::Idle);
    }

    #[test]
    fn config_from_settings() {
        let engine = EngineSettings {
            max_attempts: 2,
            ..Default::default()
        };
        let llm = LlmSettings {
            temperature: Some(0.3),
            json_response_format: true,
            ..Default::default()
        };
        let config = SessionConfig::from_settings(&engine, &llm);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.default_author, "AI Assistant");
        assert_eq!(config.completion.temperature, Some(0.3));
        assert!(config.completion.json_response);
    }

    #[test]
    fn rollback_ops_follow_application_order() {
        let deltas = vec![
            Delta::RemoveTask {
                project_id: "p1".into(),
                task_id: "a".into(),
            },
            Delta::RemoveTask {
                project_id: "p1".into(),
                task_id: "b".into(),
            },
        ];
        let ops = rollback_ops(&deltas, &portfolio());
        assert_eq!(
            ops,
            vec![
                PersistOp::DeleteTask {
                    project_id: "p1".into(),
                    task_id: "b".into()
                },
                PersistOp::DeleteTask {
                    project_id: "p1".into(),
                    task_id: "a".into()
                },
            ]
        );
    }
}
