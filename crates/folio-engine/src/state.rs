//! Per-turn state machine.
//!
//! ```text
//! Idle → Requesting → Validating ─┬→ Committed → Idle
//!            ↑                    ├→ Retrying → Requesting
//!            │                    ├→ AwaitingUser
//!            └────────────────────┴→ Failed → Idle
//! ```

use std::fmt;

use tracing::debug;

/// Where the current user turn is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Ready for input.
    #[default]
    Idle,
    /// Waiting on the model.
    Requesting,
    /// Checking the model's actions.
    Validating,
    /// Re-prompting after invalid actions.
    Retrying,
    /// The model asked a clarifying question.
    AwaitingUser,
    /// Actions applied and committed.
    Committed,
    /// Attempts exhausted or the model call failed.
    Failed,
}

impl TurnState {
    /// Lower-case name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "requesting",
            Self::Validating => "validating",
            Self::Retrying => "retrying",
            Self::AwaitingUser => "awaiting_user",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    /// Move to `next`, logging the transition.
    pub fn transition(&mut self, next: TurnState) {
        if *self != next {
            debug!(from = %self, to = %next, "turn state");
            *self = next;
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
