//! Portfolio data model.
//!
//! A [`Portfolio`] is an ordered list of [`Project`]s. Each project owns a
//! plan of [`Task`]s (each with [`Subtask`]s) and a newest-first feed of
//! [`Activity`] entries. All types use `#[serde(rename_all = "camelCase")]`
//! to match the dashboard's JSON wire format.
//!
//! Status enums decode leniently: input is lower-cased, `_` and spaces are
//! folded to `-`, and a handful of common synonyms are accepted (`done`,
//! `in_progress`, `paused`). They always serialize to their canonical
//! kebab-case spelling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fold a raw status string into the canonical comparison form.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c == ' ' { '-' } else { c })
        .collect()
}

macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $canonical:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire spelling.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $canonical,)+
                }
            }

            /// Parse a loosely formatted value (case, `_`, spaces, synonyms).
            pub fn parse_lenient(raw: &str) -> Option<Self> {
                match normalize_token(raw).as_str() {
                    $($canonical $(| $alias)* => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for &'static str {
            fn from(value: $name) -> Self {
                value.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse_lenient(&value).ok_or_else(|| {
                    let expected: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                    format!(
                        "unknown {} \"{value}\" (expected one of: {})",
                        stringify!($name),
                        expected.join(", ")
                    )
                })
            }
        }
    };
}

lenient_enum! {
    /// Lifecycle status of a project.
    ProjectStatus {
        /// Scoped but not started.
        Planning => "planning" | "planned" | "not-started",
        /// Work under way.
        Active => "active" | "in-progress",
        /// Paused.
        OnHold => "on-hold" | "onhold" | "paused",
        /// Delivered.
        Completed => "completed" | "complete" | "done",
        /// Closed without further work.
        Closed => "closed" | "cancelled" | "canceled",
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Planning
    }
}

lenient_enum! {
    /// Project priority.
    Priority {
        /// High priority.
        High => "high" | "urgent",
        /// Medium priority.
        Medium => "medium" | "med" | "normal",
        /// Low priority.
        Low => "low",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

lenient_enum! {
    /// Status shared by tasks and subtasks.
    WorkStatus {
        /// Not started.
        Todo => "todo" | "to-do" | "pending" | "not-started",
        /// Being worked on.
        InProgress => "in-progress" | "inprogress" | "started" | "doing",
        /// Finished.
        Completed => "completed" | "complete" | "done",
    }
}

impl Default for WorkStatus {
    fn default() -> Self {
        Self::Todo
    }
}

/// A sub-item of a [`Task`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Unique within the owning project.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Current status.
    #[serde(default)]
    pub status: WorkStatus,
    /// Due date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Set when the subtask transitions to completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
}

/// A work item in a project plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within the owning project.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Current status.
    #[serde(default)]
    pub status: WorkStatus,
    /// Due date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Set when the task transitions to completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<String>,
    /// Ordered subtasks.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Look up a subtask by exact id.
    pub fn subtask(&self, id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }
}

/// Links a comment to a task or subtask without reparenting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskContext {
    /// Referenced task id.
    pub task_id: String,
    /// Referenced subtask id, if the comment targets a subtask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
    /// Task title at the time of the comment.
    pub task_title: String,
    /// Subtask title at the time of the comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_title: Option<String>,
}

/// A project update or comment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique within the owning project.
    pub id: String,
    /// ISO 8601 timestamp.
    pub date: String,
    /// Display name of the author.
    #[serde(default)]
    pub author: String,
    /// Comment body.
    pub note: String,
    /// Optional task/subtask link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_context: Option<TaskContext>,
}

/// A portfolio project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Stable id.
    pub id: String,
    /// Display name, unique case-insensitively across the portfolio.
    pub name: String,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ProjectStatus,
    /// Priority.
    #[serde(default)]
    pub priority: Priority,
    /// Completion percentage, 0–100.
    #[serde(default)]
    pub progress: u8,
    /// Free-text summary of the latest status update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    /// Target delivery date (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Ordered task plan.
    #[serde(default)]
    pub plan: Vec<Task>,
    /// Activity feed, newest first.
    #[serde(default)]
    pub recent_activity: Vec<Activity>,
}

impl Project {
    /// Create an empty project in `planning` status.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ProjectStatus::default(),
            priority: Priority::default(),
            progress: 0,
            last_update: None,
            target_date: None,
            description: String::new(),
            plan: Vec::new(),
            recent_activity: Vec::new(),
        }
    }

    /// Look up a task by exact id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.plan.iter().find(|t| t.id == id)
    }

    /// Look up an activity entry by exact id.
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.recent_activity.iter().find(|a| a.id == id)
    }
}

/// The full collection of projects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Projects in display order.
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl Portfolio {
    /// Wrap a list of projects.
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// Look up a project by exact id.
    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Mutable lookup by exact id.
    pub fn project_mut(&mut self, id: &str) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    /// Number of projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether the portfolio has no projects.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
