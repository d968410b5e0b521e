//! Structural and referential validation of model-proposed actions.
//!
//! Input is untrusted JSON. Each candidate is checked in turn: it must be
//! an object, carry a `type` from the closed vocabulary, name a project
//! that resolves in the snapshot, and decode into its variant's field set.
//! A failing candidate is dropped with an error naming its index and type;
//! the rest of the batch is unaffected. Surviving actions have their
//! project reference rewritten to the canonical id and name.
//!
//! Task and subtask references are not checked here. Misses on those are
//! reported by the executor as skipped results.

use serde_json::Value;

use folio_core::Portfolio;

use crate::action::{Action, ActionKind, ProjectRef};
use crate::resolve::{resolve_project, Lookup};

/// Outcome of validating one payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Validation {
    /// Normalized actions, in submission order.
    pub valid_actions: Vec<Action>,
    /// One message per rejected candidate (or one for a bad payload).
    pub errors: Vec<String>,
}

impl Validation {
    /// Whether any candidate was rejected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Validate `payload` against `portfolio`.
pub fn validate(payload: &Value, portfolio: &Portfolio) -> Validation {
    let Value::Array(items) = payload else {
        return Validation {
            valid_actions: Vec::new(),
            errors: vec![format!(
                "actions must be an array, got {}",
                json_type_name(payload)
            )],
        };
    };

    let mut validation = Validation::default();
    for (index, item) in items.iter().enumerate() {
        match validate_one(index, item, portfolio) {
            Ok(action) => validation.valid_actions.push(action),
            Err(error) => validation.errors.push(error),
        }
    }
    validation
}

fn validate_one(index: usize, item: &Value, portfolio: &Portfolio) -> Result<Action, String> {
    let Value::Object(fields) = item else {
        return Err(format!(
            "action {index} must be an object, got {}",
            json_type_name(item)
        ));
    };

    let raw_type = match fields.get("type") {
        Some(Value::String(t)) if !t.trim().is_empty() => t.trim(),
        _ => return Err(format!("action {index} is missing a type")),
    };
    let Some(kind) = ActionKind::parse(raw_type) else {
        return Err(format!(
            "action {index} has unsupported type \"{raw_type}\""
        ));
    };

    let mut action: Action = serde_json::from_value(item.clone())
        .map_err(|e| format!("action {index} ({kind}) is malformed: {e}"))?;

    let reference = action.project();
    if reference.is_empty() {
        return Err(format!(
            "action {index} ({kind}) is missing projectId or projectName"
        ));
    }
    let lookup = Lookup::new(reference.project_id.as_ref(), reference.project_name.as_ref());
    let Some(project) = resolve_project(portfolio, lookup) else {
        return Err(format!(
            "action {index} ({kind}) references unknown project \"{}\"",
            reference.describe()
        ));
    };

    *action.project_mut() = ProjectRef {
        project_id: Some(project.id.clone()),
        project_name: Some(project.name.clone()),
    };
    Ok(action)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
