//! Task and subtask repositories.
//!
//! `sort_order` preserves plan order: new rows go after the last sibling.
//! Deleting a task removes its subtasks through the foreign key.

use rusqlite::{params, Connection, OptionalExtension};

use folio_core::{Subtask, Task, WorkStatus};

use super::parse_column;
use crate::errors::{Result, StoreError};

/// Task repository.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a task and its subtasks in one transaction.
    pub fn insert(conn: &Connection, project_id: &str, task: &Task) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        Self::insert_rows(&tx, project_id, task)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert without opening a transaction; callers own it.
    pub(crate) fn insert_rows(conn: &Connection, project_id: &str, task: &Task) -> Result<()> {
        let order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM tasks WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        let _ = conn.execute(
            "INSERT INTO tasks (project_id, id, title, status, due_date, completed_date, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project_id,
                task.id,
                task.title,
                task.status.as_str(),
                task.due_date,
                task.completed_date,
                order
            ],
        )?;
        for subtask in &task.subtasks {
            SubtaskRepo::insert(conn, project_id, &task.id, subtask)?;
        }
        Ok(())
    }

    /// Overwrite a task's own fields. Subtasks are left alone.
    pub fn update(conn: &Connection, project_id: &str, task: &Task) -> Result<()> {
        let changed = conn.execute(
            "UPDATE tasks SET title = ?3, status = ?4, due_date = ?5, completed_date = ?6
             WHERE project_id = ?1 AND id = ?2",
            params![
                project_id,
                task.id,
                task.title,
                task.status.as_str(),
                task.due_date,
                task.completed_date
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {project_id}/{}", task.id)));
        }
        Ok(())
    }

    /// Delete a task and, by cascade, its subtasks.
    pub fn delete(conn: &Connection, project_id: &str, task_id: &str) -> Result<()> {
        let changed = conn.execute(
            "DELETE FROM tasks WHERE project_id = ?1 AND id = ?2",
            params![project_id, task_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("task {project_id}/{task_id}")));
        }
        Ok(())
    }

    /// Fetch one task with its subtasks.
    pub fn get(conn: &Connection, project_id: &str, task_id: &str) -> Result<Option<Task>> {
        let task = conn
            .query_row(
                "SELECT id, title, status, due_date, completed_date
                 FROM tasks WHERE project_id = ?1 AND id = ?2",
                params![project_id, task_id],
                Self::map_row,
            )
            .optional()?;
        let Some(mut task) = task else {
            return Ok(None);
        };
        task.subtasks = SubtaskRepo::list(conn, project_id, &task.id)?;
        Ok(Some(task))
    }

    /// The project's plan, in order, with subtasks.
    pub fn list(conn: &Connection, project_id: &str) -> Result<Vec<Task>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, status, due_date, completed_date
             FROM tasks WHERE project_id = ?1
             ORDER BY sort_order, rowid",
        )?;
        let mut tasks = stmt
            .query_map(params![project_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for task in &mut tasks {
            task.subtasks = SubtaskRepo::list(conn, project_id, &task.id)?;
        }
        Ok(tasks)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
        let status: String = row.get(2)?;
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            status: parse_column(2, &status, WorkStatus::parse_lenient)?,
            due_date: row.get(3)?,
            completed_date: row.get(4)?,
            subtasks: Vec::new(),
        })
    }
}

/// Subtask repository.
pub struct SubtaskRepo;

impl SubtaskRepo {
    /// Append a subtask to a task.
    pub fn insert(conn: &Connection, project_id: &str, task_id: &str, subtask: &Subtask) -> Result<()> {
        let order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM subtasks
             WHERE project_id = ?1 AND task_id = ?2",
            params![project_id, task_id],
            |row| row.get(0),
        )?;
        let _ = conn.execute(
            "INSERT INTO subtasks
               (project_id, task_id, id, title, status, due_date, completed_date, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                project_id,
                task_id,
                subtask.id,
                subtask.title,
                subtask.status.as_str(),
                subtask.due_date,
                subtask.completed_date,
                order
            ],
        )?;
        Ok(())
    }

    /// Overwrite a subtask's fields.
    pub fn update(conn: &Connection, project_id: &str, task_id: &str, subtask: &Subtask) -> Result<()> {
        let changed = conn.execute(
            "UPDATE subtasks SET title = ?4, status = ?5, due_date = ?6, completed_date = ?7
             WHERE project_id = ?1 AND task_id = ?2 AND id = ?3",
            params![
                project_id,
                task_id,
                subtask.id,
                subtask.title,
                subtask.status.as_str(),
                subtask.due_date,
                subtask.completed_date
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "subtask {project_id}/{task_id}/{}",
                subtask.id
            )));
        }
        Ok(())
    }

    /// Delete one subtask.
    pub fn delete(conn: &Connection, project_id: &str, task_id: &str, subtask_id: &str) -> Result<()> {
        let changed = conn.execute(
            "DELETE FROM subtasks WHERE project_id = ?1 AND task_id = ?2 AND id = ?3",
            params![project_id, task_id, subtask_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "subtask {project_id}/{task_id}/{subtask_id}"
            )));
        }
        Ok(())
    }

    /// A task's subtasks, in order.
    pub fn list(conn: &Connection, project_id: &str, task_id: &str) -> Result<Vec<Subtask>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, status, due_date, completed_date
             FROM subtasks WHERE project_id = ?1 AND task_id = ?2
             ORDER BY sort_order, rowid",
        )?;
        let rows = stmt
            .query_map(params![project_id, task_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subtask> {
        let status: String = row.get(2)?;
        Ok(Subtask {
            id: row.get(0)?,
            title: row.get(1)?,
            status: parse_column(2, &status, WorkStatus::parse_lenient)?,
            due_date: row.get(3)?,
            completed_date: row.get(4)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
