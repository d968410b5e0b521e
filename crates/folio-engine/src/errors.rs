//! Error types for the mutation engine.
//!
//! Only terminal conditions live here. Validation problems are plain
//! strings accumulated per attempt, and skipped actions are ordinary
//! [`ActionResult`](crate::ledger::ActionResult)s, so neither is an error.

use thiserror::Error;

use folio_llm::ProviderError;

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The model transport failed. Not retried by the engine.
    #[error("model request failed: {0}")]
    Provider(#[from] ProviderError),

    /// Every attempt produced invalid actions.
    #[error("could not get valid actions after {attempts} attempts: {}", errors.join("; "))]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Validation errors from every attempt, each prefixed `attempt N: `.
        errors: Vec<String>,
    },

    /// Commit raced with another writer.
    #[error("stale snapshot: expected version {expected}, store is at {actual}")]
    StaleSnapshot {
        /// Version the working copy was cloned from.
        expected: u64,
        /// Version currently held by the store.
        actual: u64,
    },

    /// No assistant message with this id is in the ledger.
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// A persistence collaborator call failed.
    #[error("persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
