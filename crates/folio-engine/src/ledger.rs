//! Per-message record of applied actions and their inverse deltas.
//!
//! Each assistant message that committed actions owns an ordered list of
//! [`ActionResult`]s. Deltas that can still be undone are also tracked in
//! a flat pending list in commit order. Undo marks the result `undone` and
//! drops its deltas from the pending list, so a second undo finds nothing
//! to do.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::delta::Delta;
use crate::errors::{EngineError, Result};

/// What the user sees for one submitted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Short label for compact display.
    pub label: String,
    /// Full description of the change, or of why it was skipped.
    pub detail: String,
    /// Inverses of the mutations this action made. Empty when skipped.
    pub deltas: Vec<Delta>,
    /// Set once by undo; never cleared.
    pub undone: bool,
}

impl ActionResult {
    /// Result for an applied action.
    pub fn applied(label: impl Into<String>, detail: impl Into<String>, deltas: Vec<Delta>) -> Self {
        Self {
            label: label.into(),
            detail: detail.into(),
            deltas,
            undone: false,
        }
    }

    /// Zero-delta result for an action that could not be applied.
    pub fn skipped(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::applied(label, detail, Vec::new())
    }

    /// Whether undo would change anything.
    pub fn is_undoable(&self) -> bool {
        !self.undone && !self.deltas.is_empty()
    }
}

/// A delta awaiting possible undo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDelta {
    /// Message that committed it.
    pub message_id: String,
    /// Index of the action within that message.
    pub action_index: usize,
    /// The inverse itself.
    pub delta: Delta,
}

#[derive(Clone, Debug)]
struct LedgerEntry {
    message_id: String,
    results: Vec<ActionResult>,
}

/// In-memory ledger for one session.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    pending: Vec<PendingDelta>,
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `results` to `message_id`.
    pub fn record(&mut self, message_id: &str, results: Vec<ActionResult>) {
        for (action_index, result) in results.iter().enumerate() {
            for delta in &result.deltas {
                self.pending.push(PendingDelta {
                    message_id: message_id.to_string(),
                    action_index,
                    delta: delta.clone(),
                });
            }
        }
        self.entries.push(LedgerEntry {
            message_id: message_id.to_string(),
            results,
        });
    }

    /// Results recorded for `message_id`.
    pub fn results(&self, message_id: &str) -> Option<&[ActionResult]> {
        self.entry(message_id).map(|e| e.results.as_slice())
    }

    /// Deltas to undo for one action, or `None` when undo is a no-op.
    ///
    /// Unknown message ids are an error; an out-of-range index, an action
    /// already undone, and a skipped action are all no-ops.
    pub fn undo_deltas(&self, message_id: &str, action_index: usize) -> Result<Option<Vec<Delta>>> {
        let entry = self
            .entry(message_id)
            .ok_or_else(|| EngineError::UnknownMessage(message_id.to_string()))?;
        let Some(result) = entry.results.get(action_index) else {
            debug!(message_id, action_index, "undo index out of range, ignoring");
            return Ok(None);
        };
        if !result.is_undoable() {
            debug!(message_id, action_index, undone = result.undone, "nothing to undo");
            return Ok(None);
        }
        Ok(Some(result.deltas.clone()))
    }

    /// Mark an action undone and drop its pending deltas.
    pub fn mark_undone(&mut self, message_id: &str, action_index: usize) {
        if let Some(result) = self
            .entries
            .iter_mut()
            .find(|e| e.message_id == message_id)
            .and_then(|e| e.results.get_mut(action_index))
        {
            result.undone = true;
        }
        self.pending
            .retain(|p| !(p.message_id == message_id && p.action_index == action_index));
    }

    /// Deltas that can still be undone, in commit order.
    pub fn pending(&self) -> &[PendingDelta] {
        &self.pending
    }

    /// Number of messages with recorded results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, message_id: &str) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.message_id == message_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
