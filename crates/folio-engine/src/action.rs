//! Action schema.
//!
//! An [`Action`] is one structured mutation proposed by the model. The
//! vocabulary is closed: six kinds, each a variant with its own field set,
//! discriminated on the wire by `"type"`. Every variant carries a
//! [`ProjectRef`]. Field decoding is lenient because the input is model
//! output: ids and titles may arrive as JSON numbers, progress may be a
//! `"40%"` string, and blank strings read as absent.

use std::fmt;

use serde::{Deserialize, Serialize};

use folio_core::{ProjectStatus, WorkStatus};

/// The closed set of action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Append an activity entry.
    Comment,
    /// Append a task to the plan.
    AddTask,
    /// Change fields of an existing task.
    UpdateTask,
    /// Append a subtask to a task.
    AddSubtask,
    /// Change fields of an existing subtask.
    UpdateSubtask,
    /// Change project status, progress, target date or last update.
    UpdateProject,
}

impl ActionKind {
    /// Every kind, in prompt order.
    pub const ALL: &'static [ActionKind] = &[
        ActionKind::Comment,
        ActionKind::AddTask,
        ActionKind::UpdateTask,
        ActionKind::AddSubtask,
        ActionKind::UpdateSubtask,
        ActionKind::UpdateProject,
    ];

    /// Wire name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::AddTask => "add_task",
            Self::UpdateTask => "update_task",
            Self::AddSubtask => "add_subtask",
            Self::UpdateSubtask => "update_subtask",
            Self::UpdateProject => "update_project",
        }
    }

    /// Exact lookup by wire name.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == raw)
    }

    /// Comma-separated vocabulary, e.g. for prompts and error messages.
    pub fn vocabulary() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the target project, by id and/or name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    /// Project id as given by the model.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<String>,
    /// Project name as given by the model.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_name: Option<String>,
}

impl ProjectRef {
    /// Reference by id only.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            project_id: Some(id.into()),
            project_name: None,
        }
    }

    /// Reference by name only.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            project_id: None,
            project_name: Some(name.into()),
        }
    }

    /// Whether neither an id nor a name was given.
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none() && self.project_name.is_none()
    }

    /// Short form for messages: the id if present, else the name.
    pub fn describe(&self) -> &str {
        self.project_id
            .as_deref()
            .or(self.project_name.as_deref())
            .unwrap_or("")
    }
}

/// `comment`: add an activity entry, optionally linked to a task/subtask.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// Comment body.
    #[serde(
        default,
        alias = "comment",
        alias = "text",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<String>,
    /// Author override; the session default is used when absent.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
    /// Linked task id.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Linked task title.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_title: Option<String>,
    /// Linked subtask id.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_id: Option<String>,
    /// Linked subtask title.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_title: Option<String>,
}

/// Subtask supplied inline with `add_task`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubtask {
    /// Requested id; generated when absent or already taken.
    #[serde(
        default,
        alias = "subtaskId",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Title; defaults to `"New subtask"`.
    #[serde(
        default,
        alias = "subtaskTitle",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Initial status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    /// Due date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<String>,
    /// Completion date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_date: Option<String>,
}

/// `add_task`: append a task (with optional subtasks) to the plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTaskAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// Requested id; generated when absent or already taken.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Title; defaults to `"New task"`.
    #[serde(
        default,
        alias = "taskTitle",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Initial status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    /// Due date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<String>,
    /// Completion date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_date: Option<String>,
    /// Inline subtasks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<NewSubtask>,
}

/// Field changes shared by `update_task` and `update_subtask`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemChanges {
    /// New title.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    /// New due date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<String>,
    /// New completion date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_date: Option<String>,
}

/// `update_task`: change fields of an existing task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// Task id reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Task title reference (case-insensitive).
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_title: Option<String>,
    /// Requested changes.
    #[serde(flatten)]
    pub changes: WorkItemChanges,
}

/// `add_subtask`: append a subtask to an existing task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSubtaskAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// Parent task id reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Parent task title reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_title: Option<String>,
    /// Requested subtask id; generated when absent or already taken.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_id: Option<String>,
    /// Subtask title; defaults to `"New subtask"`.
    #[serde(
        default,
        alias = "subtaskTitle",
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Initial status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    /// Due date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<String>,
    /// Completion date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_date: Option<String>,
}

impl AddSubtaskAction {
    /// The subtask fields as a [`NewSubtask`].
    pub fn new_subtask(&self) -> NewSubtask {
        NewSubtask {
            id: self.subtask_id.clone(),
            title: self.title.clone(),
            status: self.status,
            due_date: self.due_date.clone(),
            completed_date: self.completed_date.clone(),
        }
    }
}

/// `update_subtask`: change fields of an existing subtask.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubtaskAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// Parent task id reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    /// Parent task title reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_title: Option<String>,
    /// Subtask id reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_id: Option<String>,
    /// Subtask title reference.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subtask_title: Option<String>,
    /// Requested changes.
    #[serde(flatten)]
    pub changes: WorkItemChanges,
}

/// `update_project`: change project-level fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectAction {
    /// Target project.
    #[serde(flatten)]
    pub project: ProjectRef,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// New progress; clamped to 0–100 on apply.
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub progress: Option<f64>,
    /// New target date.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_date: Option<String>,
    /// New status summary.
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<String>,
}

/// One mutation proposed by the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// See [`CommentAction`].
    Comment(CommentAction),
    /// See [`AddTaskAction`].
    AddTask(AddTaskAction),
    /// See [`UpdateTaskAction`].
    UpdateTask(UpdateTaskAction),
    /// See [`AddSubtaskAction`].
    AddSubtask(AddSubtaskAction),
    /// See [`UpdateSubtaskAction`].
    UpdateSubtask(UpdateSubtaskAction),
    /// See [`UpdateProjectAction`].
    UpdateProject(UpdateProjectAction),
}

impl Action {
    /// Discriminant of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Comment(_) => ActionKind::Comment,
            Self::AddTask(_) => ActionKind::AddTask,
            Self::UpdateTask(_) => ActionKind::UpdateTask,
            Self::AddSubtask(_) => ActionKind::AddSubtask,
            Self::UpdateSubtask(_) => ActionKind::UpdateSubtask,
            Self::UpdateProject(_) => ActionKind::UpdateProject,
        }
    }

    /// Project reference carried by every variant.
    pub fn project(&self) -> &ProjectRef {
        match self {
            Self::Comment(a) => &a.project,
            Self::AddTask(a) => &a.project,
            Self::UpdateTask(a) => &a.project,
            Self::AddSubtask(a) => &a.project,
            Self::UpdateSubtask(a) => &a.project,
            Self::UpdateProject(a) => &a.project,
        }
    }

    /// Mutable project reference, used to normalize after resolution.
    pub fn project_mut(&mut self) -> &mut ProjectRef {
        match self {
            Self::Comment(a) => &mut a.project,
            Self::AddTask(a) => &mut a.project,
            Self::UpdateTask(a) => &mut a.project,
            Self::AddSubtask(a) => &mut a.project,
            Self::UpdateSubtask(a) => &mut a.project,
            Self::UpdateProject(a) => &mut a.project,
        }
    }
}

/// Tolerant field deserializers for model-produced JSON.
pub(crate) mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// String or number; blank strings and `null` read as `None`.
    pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected a string, got {other}"
            ))),
        }
    }

    /// Number or numeric string (a trailing `%` is ignored).
    pub(crate) fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| D::Error::custom("number out of range")),
            Some(Value::String(s)) => {
                let trimmed = s.trim().trim_end_matches('%').trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("expected a number, got \"{s}\"")))
            }
            Some(other) => Err(D::Error::custom(format!(
                "expected a number, got {other}"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
