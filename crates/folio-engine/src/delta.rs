//! Inverse deltas.
//!
//! A [`Delta`] undoes exactly one forward mutation. `remove_*` variants
//! undo creations by filtering the entity out by id. `restore_*` variants
//! undo updates by writing back the captured field set, leaving every
//! other field and sibling untouched.

use serde::{Deserialize, Deserializer, Serialize};

use folio_core::{Portfolio, Project, ProjectStatus, Subtask, Task, WorkStatus};

/// Prior values of the task or subtask fields one update changed.
///
/// Only changed fields are `Some`; undo writes back exactly those, so a
/// later edit to a different field of the same item survives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItemFields {
    /// Title before the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Status before the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkStatus>,
    /// Due date before the update; `Some(None)` means it was unset.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
    /// Completion date before the update; `Some(None)` means it was unset.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_date: Option<Option<String>>,
}

impl WorkItemFields {
    /// Whether no field was captured.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.completed_date.is_none()
    }

    pub(crate) fn write_task(&self, task: &mut Task) {
        self.write(WorkItemMut::from(task));
    }

    pub(crate) fn write_subtask(&self, subtask: &mut Subtask) {
        self.write(WorkItemMut::from(subtask));
    }

    fn write(&self, item: WorkItemMut<'_>) {
        if let Some(title) = &self.title {
            item.title.clone_from(title);
        }
        if let Some(status) = self.status {
            *item.status = status;
        }
        if let Some(due_date) = &self.due_date {
            item.due_date.clone_from(due_date);
        }
        if let Some(completed_date) = &self.completed_date {
            item.completed_date.clone_from(completed_date);
        }
    }
}

/// Mutable view over the fields tasks and subtasks share.
pub(crate) struct WorkItemMut<'a> {
    pub(crate) title: &'a mut String,
    pub(crate) status: &'a mut WorkStatus,
    pub(crate) due_date: &'a mut Option<String>,
    pub(crate) completed_date: &'a mut Option<String>,
}

impl<'a> From<&'a mut Task> for WorkItemMut<'a> {
    fn from(task: &'a mut Task) -> Self {
        Self {
            title: &mut task.title,
            status: &mut task.status,
            due_date: &mut task.due_date,
            completed_date: &mut task.completed_date,
        }
    }
}

impl<'a> From<&'a mut Subtask> for WorkItemMut<'a> {
    fn from(subtask: &'a mut Subtask) -> Self {
        Self {
            title: &mut subtask.title,
            status: &mut subtask.status,
            due_date: &mut subtask.due_date,
            completed_date: &mut subtask.completed_date,
        }
    }
}

/// Prior values of the project fields one `update_project` changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    /// Status before the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// Progress before the update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Target date before the update; `Some(None)` means it was unset.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_date: Option<Option<String>>,
    /// Last-update summary before the update; `Some(None)` means it was unset.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<Option<String>>,
}

impl ProjectFields {
    /// Whether no field was captured.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.progress.is_none()
            && self.target_date.is_none()
            && self.last_update.is_none()
    }

    fn write(&self, project: &mut Project) {
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(progress) = self.progress {
            project.progress = progress;
        }
        if let Some(target_date) = &self.target_date {
            project.target_date.clone_from(target_date);
        }
        if let Some(last_update) = &self.last_update {
            project.last_update.clone_from(last_update);
        }
    }
}

/// Present-but-null reads as `Some(None)`; absence is handled by `default`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// The inverse of one committed mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Delta {
    /// Undo a `comment`.
    #[serde(rename_all = "camelCase")]
    RemoveActivity {
        /// Owning project.
        project_id: String,
        /// Activity to remove.
        activity_id: String,
    },
    /// Undo an `add_task`.
    #[serde(rename_all = "camelCase")]
    RemoveTask {
        /// Owning project.
        project_id: String,
        /// Task to remove.
        task_id: String,
    },
    /// Undo an `update_task`.
    #[serde(rename_all = "camelCase")]
    RestoreTask {
        /// Owning project.
        project_id: String,
        /// Task to restore.
        task_id: String,
        /// Field values before the update.
        previous: WorkItemFields,
    },
    /// Undo an `add_subtask`.
    #[serde(rename_all = "camelCase")]
    RemoveSubtask {
        /// Owning project.
        project_id: String,
        /// Parent task.
        task_id: String,
        /// Subtask to remove.
        subtask_id: String,
    },
    /// Undo an `update_subtask`.
    #[serde(rename_all = "camelCase")]
    RestoreSubtask {
        /// Owning project.
        project_id: String,
        /// Parent task.
        task_id: String,
        /// Subtask to restore.
        subtask_id: String,
        /// Field values before the update.
        previous: WorkItemFields,
    },
    /// Undo an `update_project`.
    #[serde(rename_all = "camelCase")]
    RestoreProject {
        /// Project to restore.
        project_id: String,
        /// Field values before the update.
        previous: ProjectFields,
    },
}

impl Delta {
    /// Project the delta applies to.
    pub fn project_id(&self) -> &str {
        match self {
            Self::RemoveActivity { project_id, .. }
            | Self::RemoveTask { project_id, .. }
            | Self::RestoreTask { project_id, .. }
            | Self::RemoveSubtask { project_id, .. }
            | Self::RestoreSubtask { project_id, .. }
            | Self::RestoreProject { project_id, .. } => project_id,
        }
    }

    /// Wire name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RemoveActivity { .. } => "remove_activity",
            Self::RemoveTask { .. } => "remove_task",
            Self::RestoreTask { .. } => "restore_task",
            Self::RemoveSubtask { .. } => "remove_subtask",
            Self::RestoreSubtask { .. } => "restore_subtask",
            Self::RestoreProject { .. } => "restore_project",
        }
    }

    /// Apply this inverse to `portfolio`.
    ///
    /// Returns `false` when the target entity no longer exists, in which
    /// case nothing is changed.
    pub fn apply(&self, portfolio: &mut Portfolio) -> bool {
        let Some(project) = portfolio.project_mut(self.project_id()) else {
            return false;
        };
        match self {
            Self::RemoveActivity { activity_id, .. } => {
                remove_where(&mut project.recent_activity, |a| &a.id == activity_id)
            }
            Self::RemoveTask { task_id, .. } => {
                remove_where(&mut project.plan, |t| &t.id == task_id)
            }
            Self::RestoreTask {
                task_id, previous, ..
            } => match project.plan.iter_mut().find(|t| &t.id == task_id) {
                Some(task) => {
                    previous.write_task(task);
                    true
                }
                None => false,
            },
            Self::RemoveSubtask {
                task_id,
                subtask_id,
                ..
            } => match project.plan.iter_mut().find(|t| &t.id == task_id) {
                Some(task) => remove_where(&mut task.subtasks, |s| &s.id == subtask_id),
                None => false,
            },
            Self::RestoreSubtask {
                task_id,
                subtask_id,
                previous,
                ..
            } => {
                let subtask = project
                    .plan
                    .iter_mut()
                    .find(|t| &t.id == task_id)
                    .and_then(|t| t.subtasks.iter_mut().find(|s| &s.id == subtask_id));
                match subtask {
                    Some(subtask) => {
                        previous.write_subtask(subtask);
                        true
                    }
                    None => false,
                }
            }
            Self::RestoreProject { previous, .. } => {
                previous.write(project);
                true
            }
        }
    }
}

/// Apply `deltas` last-to-first. Returns how many found their target.
pub fn apply_in_reverse(portfolio: &mut Portfolio, deltas: &[Delta]) -> usize {
    deltas.iter().rev().filter(|d| d.apply(portfolio)).count()
}

fn remove_where<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = items.len();
    items.retain(|item| !pred(item));
    items.len() != before
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
