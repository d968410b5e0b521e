//! [`Persistence`] backed by the SQLite repositories.
//!
//! Each call takes a pooled connection and runs one short statement or
//! transaction, then appends an `audit_log` row describing it. An audit
//! write that fails is logged and does not undo the change. The session
//! logs failures; nothing is retried here.

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::{debug, warn};

use folio_core::{Activity, Portfolio, Project, Subtask, Task};
use folio_engine::Persistence;

use crate::connection::{ConnectionPool, PooledConnection};
use crate::errors::Result;
use crate::repositories::{ActivityRepo, AuditRepo, ProjectRepo, SubtaskRepo, TaskRepo};

type EngineResult<T> = folio_engine::Result<T>;

const NOTE_PREVIEW_CHARS: usize = 100;

/// SQLite persistence collaborator.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: ConnectionPool,
}

impl SqlitePersistence {
    /// Wrap a migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Load the whole portfolio.
    pub fn load_portfolio(&self) -> Result<Portfolio> {
        let conn = self.conn()?;
        let projects = ProjectRepo::list(&conn)?;
        debug!(projects = projects.len(), "portfolio loaded");
        Ok(Portfolio::new(projects))
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }
}

fn audit(conn: &Connection, action: &str, entity_type: &str, entity_id: &str, details: &Value) {
    if let Err(e) = AuditRepo::record(conn, action, entity_type, entity_id, details) {
        warn!(action, entity_type, entity_id, error = %e, "audit entry not recorded");
    }
}

fn preview(note: &str) -> String {
    note.chars().take(NOTE_PREVIEW_CHARS).collect()
}

#[async_trait]
impl Persistence for SqlitePersistence {
    async fn create_project(&self, project: &Project) -> EngineResult<()> {
        let conn = self.conn()?;
        ProjectRepo::insert(&conn, project)?;
        audit(
            &conn,
            "create_project",
            "project",
            &project.id,
            &json!({ "name": project.name, "status": project.status }),
        );
        Ok(())
    }

    async fn update_project(&self, project: &Project) -> EngineResult<()> {
        let conn = self.conn()?;
        ProjectRepo::update(&conn, project)?;
        audit(
            &conn,
            "update_project",
            "project",
            &project.id,
            &json!({ "name": project.name, "status": project.status, "progress": project.progress }),
        );
        Ok(())
    }

    async fn add_activity(&self, project_id: &str, activity: &Activity) -> EngineResult<()> {
        let conn = self.conn()?;
        ActivityRepo::insert(&conn, project_id, activity)?;
        audit(
            &conn,
            "add_activity",
            "activity",
            &activity.id,
            &json!({
                "projectId": project_id,
                "author": activity.author,
                "notePreview": preview(&activity.note),
            }),
        );
        Ok(())
    }

    async fn delete_activity(&self, project_id: &str, activity_id: &str) -> EngineResult<()> {
        let conn = self.conn()?;
        ActivityRepo::delete(&conn, project_id, activity_id)?;
        audit(&conn, "delete_activity", "activity", activity_id, &json!({ "projectId": project_id }));
        Ok(())
    }

    async fn add_task(&self, project_id: &str, task: &Task) -> EngineResult<()> {
        let conn = self.conn()?;
        TaskRepo::insert(&conn, project_id, task)?;
        audit(
            &conn,
            "add_task",
            "task",
            &task.id,
            &json!({ "projectId": project_id, "title": task.title, "subtasks": task.subtasks.len() }),
        );
        Ok(())
    }

    async fn update_task(&self, project_id: &str, task: &Task) -> EngineResult<()> {
        let conn = self.conn()?;
        TaskRepo::update(&conn, project_id, task)?;
        audit(
            &conn,
            "update_task",
            "task",
            &task.id,
            &json!({ "projectId": project_id, "title": task.title, "status": task.status }),
        );
        Ok(())
    }

    async fn delete_task(&self, project_id: &str, task_id: &str) -> EngineResult<()> {
        let conn = self.conn()?;
        TaskRepo::delete(&conn, project_id, task_id)?;
        audit(&conn, "delete_task", "task", task_id, &json!({ "projectId": project_id }));
        Ok(())
    }

    async fn add_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> EngineResult<()> {
        let conn = self.conn()?;
        SubtaskRepo::insert(&conn, project_id, task_id, subtask)?;
        audit(
            &conn,
            "add_subtask",
            "subtask",
            &subtask.id,
            &json!({ "projectId": project_id, "taskId": task_id, "title": subtask.title }),
        );
        Ok(())
    }

    async fn update_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> EngineResult<()> {
        let conn = self.conn()?;
        SubtaskRepo::update(&conn, project_id, task_id, subtask)?;
        audit(
            &conn,
            "update_subtask",
            "subtask",
            &subtask.id,
            &json!({
                "projectId": project_id,
                "taskId": task_id,
                "title": subtask.title,
                "status": subtask.status,
            }),
        );
        Ok(())
    }

    async fn delete_subtask(&self, project_id: &str, task_id: &str, subtask_id: &str) -> EngineResult<()> {
        let conn = self.conn()?;
        SubtaskRepo::delete(&conn, project_id, task_id, subtask_id)?;
        audit(
            &conn,
            "delete_subtask",
            "subtask",
            subtask_id,
            &json!({ "projectId": project_id, "taskId": task_id }),
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use folio_core::WorkStatus;
    use folio_engine::EngineError;

    use super::*;
    use crate::connection::{new_in_memory, ConnectionConfig};
    use crate::migrations::run_migrations;

    fn persistence() -> SqlitePersistence {
        let pool = new_in_memory(&ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        })
        .unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        SqlitePersistence::new(pool)
    }

    fn task(id: &str) -> Task {
        Task {
            id: id.into(),
            title: "Design".into(),
            status: WorkStatus::Todo,
            due_date: None,
            completed_date: None,
            subtasks: Vec::new(),
        }
    }

    #[tokio::test]
    async fn calls_are_visible_in_load() {
        let db = persistence();
        db.create_project(&Project::new("p1", "Alpha")).await.unwrap();
        db.add_task("p1", &task("t1")).await.unwrap();

        let mut done = task("t1");
        done.status = WorkStatus::Completed;
        db.update_task("p1", &done).await.unwrap();

        let portfolio = db.load_portfolio().unwrap();
        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio.projects[0].plan[0].status, WorkStatus::Completed);

        db.delete_task("p1", "t1").await.unwrap();
        assert!(db.load_portfolio().unwrap().projects[0].plan.is_empty());
    }

    #[tokio::test]
    async fn every_call_leaves_an_audit_entry() {
        let db = persistence();
        db.create_project(&Project::new("p1", "Alpha")).await.unwrap();
        db.add_task("p1", &task("t1")).await.unwrap();
        let mut done = task("t1");
        done.status = WorkStatus::Completed;
        db.update_task("p1", &done).await.unwrap();
        db.delete_task("p1", "t1").await.unwrap();

        let conn = db.conn().unwrap();
        let entries = AuditRepo::for_entity(&conn, "task", "t1").unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, vec!["add_task", "update_task", "delete_task"]);
        assert_eq!(
            entries[1].details,
            Some(json!({ "projectId": "p1", "title": "Design", "status": "completed" }))
        );
        assert_eq!(AuditRepo::for_entity(&conn, "project", "p1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_call_is_not_audited() {
        let db = persistence();
        assert!(db.delete_task("p1", "t1").await.is_err());
        assert!(AuditRepo::recent(&db.conn().unwrap(), 10).unwrap().is_empty());
    }

    #[test]
    fn note_preview_is_bounded_by_chars() {
        let note = "é".repeat(150);
        assert_eq!(preview(&note).chars().count(), NOTE_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn store_errors_surface_as_persistence_errors() {
        let db = persistence();
        let err = db.delete_task("p1", "t1").await.unwrap_err();
        assert_matches!(err, EngineError::Persistence(_));
    }
}
