//! # folio-engine
//!
//! Turns model replies into safe, reversible portfolio mutations.
//!
//! - **Actions**: the closed six-kind vocabulary and its lenient wire schema
//! - **Validation**: per-action structural and project checks with retry-ready messages
//! - **Execution**: clone-then-apply against a snapshot, emitting inverse deltas
//! - **Ledger**: per-message, per-action delta bookkeeping for undo
//! - **Orchestration**: bounded retry loop with corrective feedback
//! - **Store**: versioned snapshots with compare-and-swap commit
//! - **Session**: `send_message`, `undo_action`, `continue_with_user_response`

#![deny(unsafe_code)]

pub mod action;
pub mod delta;
pub mod errors;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod parse;
pub mod persistence;
pub mod prompt;
pub mod resolve;
pub mod session;
pub mod state;
pub mod store;
pub mod validate;

pub use action::{
    Action, ActionKind, AddSubtaskAction, AddTaskAction, CommentAction, NewSubtask, ProjectRef,
    UpdateProjectAction, UpdateSubtaskAction, UpdateTaskAction, WorkItemChanges,
};
pub use delta::{apply_in_reverse, Delta, ProjectFields, WorkItemFields};
pub use errors::{EngineError, Result};
pub use executor::{apply_action, apply_actions, Execution, ExecutionContext};
pub use ledger::{ActionResult, Ledger, PendingDelta};
pub use orchestrator::{ModelTurn, RetryOrchestrator, DEFAULT_MAX_ATTEMPTS};
pub use parse::{parse_reply, ParsedReply};
pub use persistence::{NoopPersistence, PersistOp, Persistence};
pub use prompt::{retry_message, system_prompt};
pub use session::{AssistantMessage, ChatSession, MessageStatus, SessionConfig};
pub use state::TurnState;
pub use store::{InMemoryStore, PortfolioStore, Snapshot};
pub use validate::{validate, Validation};
