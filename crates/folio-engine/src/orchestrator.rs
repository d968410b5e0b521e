//! Bounded retry loop against the model.
//!
//! Each attempt sends the running message list, parses the reply, and
//! validates its actions against the turn's snapshot. A reply with any
//! validation error is answered with the raw reply plus a corrective
//! system message and retried while attempts remain. Transport errors end
//! the turn at once; the transport owns its own timeouts.

use tracing::{debug, error, warn};

use folio_core::Portfolio;
use folio_llm::{ChatMessage, ChatModel, CompletionOptions};

use crate::action::Action;
use crate::errors::{EngineError, Result};
use crate::parse::parse_reply;
use crate::prompt::retry_message;
use crate::state::TurnState;
use crate::validate::validate;

/// Default attempt budget per user turn.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A successful model exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelTurn {
    /// Text to show the user.
    pub display_text: String,
    /// Validated, normalized actions. Empty for plain-text replies.
    pub actions: Vec<Action>,
    /// Clarifying question; when set, `actions` is empty.
    pub question: Option<String>,
    /// Attempts used, starting at 1.
    pub attempts: u32,
    /// The accepted raw reply.
    pub raw_reply: String,
}

/// Drives one user turn against the model.
pub struct RetryOrchestrator<'a> {
    model: &'a dyn ChatModel,
    options: &'a CompletionOptions,
    max_attempts: u32,
}

impl<'a> RetryOrchestrator<'a> {
    /// Orchestrator with at least one attempt.
    pub fn new(model: &'a dyn ChatModel, options: &'a CompletionOptions, max_attempts: u32) -> Self {
        Self {
            model,
            options,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Request actions until they validate or the budget runs out.
    ///
    /// `messages` is the full conversation, system prompt first. It is
    /// extended with each rejected reply and its correction.
    pub async fn request_actions(
        &self,
        mut messages: Vec<ChatMessage>,
        portfolio: &Portfolio,
        state: &mut TurnState,
    ) -> Result<ModelTurn> {
        let mut all_errors = Vec::new();

        for attempt in 1..=self.max_attempts {
            state.transition(TurnState::Requesting);
            debug!(attempt, max_attempts = self.max_attempts, model = self.model.model(), "requesting actions");

            let raw = match self.model.complete(&messages, self.options).await {
                Ok(raw) => raw,
                Err(e) => {
                    error!(attempt, category = e.category(), error = %e, "model request failed");
                    state.transition(TurnState::Failed);
                    return Err(EngineError::Provider(e));
                }
            };

            state.transition(TurnState::Validating);
            let parsed = parse_reply(&raw);

            if let Some(question) = parsed.question {
                debug!(attempt, "model asked a clarifying question");
                return Ok(ModelTurn {
                    display_text: parsed.display_text,
                    actions: Vec::new(),
                    question: Some(question),
                    attempts: attempt,
                    raw_reply: raw,
                });
            }

            let validation = validate(&parsed.actions, portfolio);
            if !validation.has_errors() {
                debug!(attempt, actions = validation.valid_actions.len(), "actions validated");
                return Ok(ModelTurn {
                    display_text: parsed.display_text,
                    actions: validation.valid_actions,
                    question: None,
                    attempts: attempt,
                    raw_reply: raw,
                });
            }

            warn!(attempt, errors = ?validation.errors, "model actions failed validation");
            if attempt < self.max_attempts {
                state.transition(TurnState::Retrying);
                messages.push(ChatMessage::assistant(raw));
                messages.push(ChatMessage::system(retry_message(&validation.errors)));
            }
            all_errors.extend(validation.errors.iter().map(|e| format!("attempt {attempt}: {e}")));
        }

        error!(attempts = self.max_attempts, errors = ?all_errors, "retry budget exhausted");
        state.transition(TurnState::Failed);
        Err(EngineError::RetriesExhausted {
            attempts: self.max_attempts,
            errors: all_errors,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
