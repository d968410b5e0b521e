//! Persistence collaborator.
//!
//! The in-memory store is authoritative. After a commit or a rollback the
//! session derives one [`PersistOp`] per delta from the resulting
//! portfolio and hands it to a [`Persistence`] backend. Failures are
//! logged and otherwise ignored.

use async_trait::async_trait;
use tracing::warn;

use folio_core::{Activity, Portfolio, Project, Subtask, Task};

use crate::delta::Delta;
use crate::errors::Result;

/// Backend that mirrors committed changes to durable storage.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Insert a project with its plan and activity.
    async fn create_project(&self, project: &Project) -> Result<()>;
    /// Overwrite project-level fields.
    async fn update_project(&self, project: &Project) -> Result<()>;
    /// Insert an activity entry.
    async fn add_activity(&self, project_id: &str, activity: &Activity) -> Result<()>;
    /// Delete an activity entry.
    async fn delete_activity(&self, project_id: &str, activity_id: &str) -> Result<()>;
    /// Insert a task with its subtasks.
    async fn add_task(&self, project_id: &str, task: &Task) -> Result<()>;
    /// Overwrite task fields.
    async fn update_task(&self, project_id: &str, task: &Task) -> Result<()>;
    /// Delete a task and its subtasks.
    async fn delete_task(&self, project_id: &str, task_id: &str) -> Result<()>;
    /// Insert a subtask.
    async fn add_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> Result<()>;
    /// Overwrite subtask fields.
    async fn update_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> Result<()>;
    /// Delete a subtask.
    async fn delete_subtask(&self, project_id: &str, task_id: &str, subtask_id: &str) -> Result<()>;
}

/// Backend that stores nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPersistence;

#[async_trait]
impl Persistence for NoopPersistence {
    async fn create_project(&self, _project: &Project) -> Result<()> {
        Ok(())
    }
    async fn update_project(&self, _project: &Project) -> Result<()> {
        Ok(())
    }
    async fn add_activity(&self, _project_id: &str, _activity: &Activity) -> Result<()> {
        Ok(())
    }
    async fn delete_activity(&self, _project_id: &str, _activity_id: &str) -> Result<()> {
        Ok(())
    }
    async fn add_task(&self, _project_id: &str, _task: &Task) -> Result<()> {
        Ok(())
    }
    async fn update_task(&self, _project_id: &str, _task: &Task) -> Result<()> {
        Ok(())
    }
    async fn delete_task(&self, _project_id: &str, _task_id: &str) -> Result<()> {
        Ok(())
    }
    async fn add_subtask(&self, _project_id: &str, _task_id: &str, _subtask: &Subtask) -> Result<()> {
        Ok(())
    }
    async fn update_subtask(&self, _project_id: &str, _task_id: &str, _subtask: &Subtask) -> Result<()> {
        Ok(())
    }
    async fn delete_subtask(&self, _project_id: &str, _task_id: &str, _subtask_id: &str) -> Result<()> {
        Ok(())
    }
}

/// One call to make against a [`Persistence`] backend.
#[derive(Clone, Debug, PartialEq)]
pub enum PersistOp {
    /// See [`Persistence::update_project`].
    UpdateProject(Project),
    /// See [`Persistence::add_activity`].
    AddActivity {
        /// Owning project.
        project_id: String,
        /// Entry to insert.
        activity: Activity,
    },
    /// See [`Persistence::delete_activity`].
    DeleteActivity {
        /// Owning project.
        project_id: String,
        /// Entry to delete.
        activity_id: String,
    },
    /// See [`Persistence::add_task`].
    AddTask {
        /// Owning project.
        project_id: String,
        /// Task to insert.
        task: Task,
    },
    /// See [`Persistence::update_task`].
    UpdateTask {
        /// Owning project.
        project_id: String,
        /// Post-mutation task.
        task: Task,
    },
    /// See [`Persistence::delete_task`].
    DeleteTask {
        /// Owning project.
        project_id: String,
        /// Task to delete.
        task_id: String,
    },
    /// See [`Persistence::add_subtask`].
    AddSubtask {
        /// Owning project.
        project_id: String,
        /// Parent task.
        task_id: String,
        /// Subtask to insert.
        subtask: Subtask,
    },
    /// See [`Persistence::update_subtask`].
    UpdateSubtask {
        /// Owning project.
        project_id: String,
        /// Parent task.
        task_id: String,
        /// Post-mutation subtask.
        subtask: Subtask,
    },
    /// See [`Persistence::delete_subtask`].
    DeleteSubtask {
        /// Owning project.
        project_id: String,
        /// Parent task.
        task_id: String,
        /// Subtask to delete.
        subtask_id: String,
    },
}

impl PersistOp {
    /// Operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateProject(_) => "update_project",
            Self::AddActivity { .. } => "add_activity",
            Self::DeleteActivity { .. } => "delete_activity",
            Self::AddTask { .. } => "add_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::AddSubtask { .. } => "add_subtask",
            Self::UpdateSubtask { .. } => "update_subtask",
            Self::DeleteSubtask { .. } => "delete_subtask",
        }
    }

    /// Run this operation against `backend`.
    pub async fn run(&self, backend: &dyn Persistence) -> Result<()> {
        match self {
            Self::UpdateProject(project) => backend.update_project(project).await,
            Self::AddActivity {
                project_id,
                activity,
            } => backend.add_activity(project_id, activity).await,
            Self::DeleteActivity {
                project_id,
                activity_id,
            } => backend.delete_activity(project_id, activity_id).await,
            Self::AddTask { project_id, task } => backend.add_task(project_id, task).await,
            Self::UpdateTask { project_id, task } => backend.update_task(project_id, task).await,
            Self::DeleteTask {
                project_id,
                task_id,
            } => backend.delete_task(project_id, task_id).await,
            Self::AddSubtask {
                project_id,
                task_id,
                subtask,
            } => backend.add_subtask(project_id, task_id, subtask).await,
            Self::UpdateSubtask {
                project_id,
                task_id,
                subtask,
            } => backend.update_subtask(project_id, task_id, subtask).await,
            Self::DeleteSubtask {
                project_id,
                task_id,
                subtask_id,
            } => backend.delete_subtask(project_id, task_id, subtask_id).await,
        }
    }
}

fn find_task<'p>(portfolio: &'p Portfolio, project_id: &str, task_id: &str) -> Option<&'p Task> {
    portfolio.project(project_id)?.task(task_id)
}

fn find_subtask<'p>(
    portfolio: &'p Portfolio,
    project_id: &str,
    task_id: &str,
    subtask_id: &str,
) -> Option<&'p Subtask> {
    find_task(portfolio, project_id, task_id)?.subtask(subtask_id)
}

/// Operation that mirrors the forward mutation `delta` inverts.
///
/// `after` is the portfolio right after the action that produced `delta`.
/// Returns `None` if the entity is not present.
pub fn forward_op(delta: &Delta, after: &Portfolio) -> Option<PersistOp> {
    match delta {
        Delta::RemoveActivity {
            project_id,
            activity_id,
        } => Some(PersistOp::AddActivity {
            project_id: project_id.clone(),
            activity: after.project(project_id)?.activity(activity_id)?.clone(),
        }),
        Delta::RemoveTask {
            project_id,
            task_id,
        } => Some(PersistOp::AddTask {
            project_id: project_id.clone(),
            task: find_task(after, project_id, task_id)?.clone(),
        }),
        Delta::RestoreTask {
            project_id,
            task_id,
            ..
        } => Some(PersistOp::UpdateTask {
            project_id: project_id.clone(),
            task: find_task(after, project_id, task_id)?.clone(),
        }),
        Delta::RemoveSubtask {
            project_id,
            task_id,
            subtask_id,
        } => Some(PersistOp::AddSubtask {
            project_id: project_id.clone(),
            task_id: task_id.clone(),
            subtask: find_subtask(after, project_id, task_id, subtask_id)?.clone(),
        }),
        Delta::RestoreSubtask {
            project_id,
            task_id,
            subtask_id,
            ..
        } => Some(PersistOp::UpdateSubtask {
            project_id: project_id.clone(),
            task_id: task_id.clone(),
            subtask: find_subtask(after, project_id, task_id, subtask_id)?.clone(),
        }),
        Delta::RestoreProject { project_id, .. } => Some(PersistOp::UpdateProject(
            after.project(project_id)?.clone(),
        )),
    }
}

/// Operation that mirrors applying `delta` itself.
///
/// `restored` is the portfolio after the rollback.
pub fn inverse_op(delta: &Delta, restored: &Portfolio) -> Option<PersistOp> {
    match delta {
        Delta::RemoveActivity {
            project_id,
            activity_id,
        } => Some(PersistOp::DeleteActivity {
            project_id: project_id.clone(),
            activity_id: activity_id.clone(),
        }),
        Delta::RemoveTask {
            project_id,
            task_id,
        } => Some(PersistOp::DeleteTask {
            project_id: project_id.clone(),
            task_id: task_id.clone(),
        }),
        Delta::RemoveSubtask {
            project_id,
            task_id,
            subtask_id,
        } => Some(PersistOp::DeleteSubtask {
            project_id: project_id.clone(),
            task_id: task_id.clone(),
            subtask_id: subtask_id.clone(),
        }),
        Delta::RestoreTask { .. } | Delta::RestoreSubtask { .. } | Delta::RestoreProject { .. } => {
            forward_op(delta, restored)
        }
    }
}

/// Run `ops` in order, logging failures.
pub async fn persist_all(backend: &dyn Persistence, ops: &[PersistOp]) -> usize {
    let mut failures = 0;
    for op in ops {
        if let Err(e) = op.run(backend).await {
            failures += 1;
            warn!(op = op.name(), error = %e, "persistence call failed");
        }
    }
    failures
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
