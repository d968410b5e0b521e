//! Activity repository: the `activities` table.
//!
//! Rows come back newest first. New entries always get the highest rowid,
//! which mirrors the in-memory feed where comments are prepended.

use rusqlite::{params, Connection};
use serde_json::Value;

use folio_core::{Activity, TaskContext};

use crate::errors::{Result, StoreError};

/// Activity repository.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Insert one entry.
    pub fn insert(conn: &Connection, project_id: &str, activity: &Activity) -> Result<()> {
        let context = activity
            .task_context
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let _ = conn.execute(
            "INSERT INTO activities (project_id, id, date, author, note, task_context)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project_id,
                activity.id,
                activity.date,
                activity.author,
                activity.note,
                context
            ],
        )?;
        Ok(())
    }

    /// Delete one entry.
    pub fn delete(conn: &Connection, project_id: &str, activity_id: &str) -> Result<()> {
        let changed = conn.execute(
            "DELETE FROM activities WHERE project_id = ?1 AND id = ?2",
            params![project_id, activity_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("activity {project_id}/{activity_id}")));
        }
        Ok(())
    }

    /// Every entry of a project, newest first.
    pub fn list(conn: &Connection, project_id: &str) -> Result<Vec<Activity>> {
        let mut stmt = conn.prepare(
            "SELECT id, date, author, note, task_context
             FROM activities WHERE project_id = ?1
             ORDER BY rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![project_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Activity> {
        let context: Option<Value> = row.get(4)?;
        let task_context = context
            .map(serde_json::from_value::<TaskContext>)
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
            })?;
        Ok(Activity {
            id: row.get(0)?,
            date: row.get(1)?,
            author: row.get(2)?,
            note: row.get(3)?,
            task_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::ProjectRepo;
    use crate::testutil::migrated;
    use folio_core::Project;

    fn activity(id: &str, note: &str) -> Activity {
        Activity {
            id: id.into(),
            date: "2026-10-16T10:00:00Z".into(),
            author: "Dana".into(),
            note: note.into(),
            task_context: None,
        }
    }

    #[test]
    fn list_is_newest_first() {
        let conn = migrated();
        ProjectRepo::insert(&conn, &Project::new("p1", "Alpha")).unwrap();
        ActivityRepo::insert(&conn, "p1", &activity("a1", "first")).unwrap();
        ActivityRepo::insert(&conn, "p1", &activity("a2", "second")).unwrap();

        let notes: Vec<_> = ActivityRepo::list(&conn, "p1")
            .unwrap()
            .into_iter()
            .map(|a| a.note)
            .collect();
        assert_eq!(notes, vec!["second", "first"]);
    }

    #[test]
    fn task_context_round_trips() {
        let conn = migrated();
        ProjectRepo::insert(&conn, &Project::new("p1", "Alpha")).unwrap();
        let mut entry = activity("a1", "linked");
        entry.task_context = Some(TaskContext {
            task_id: "t1".into(),
            subtask_id: Some("s1".into()),
            task_title: "Design".into(),
            subtask_title: Some("Sketch".into()),
        });
        ActivityRepo::insert(&conn, "p1", &entry).unwrap();
        assert_eq!(ActivityRepo::list(&conn, "p1").unwrap(), vec![entry]);
    }

    #[test]
    fn deleting_missing_entry_is_not_found() {
        let conn = migrated();
        ProjectRepo::insert(&conn, &Project::new("p1", "Alpha")).unwrap();
        assert!(matches!(
            ActivityRepo::delete(&conn, "p1", "nope"),
            Err(StoreError::NotFound(_))
        ));
    }
}
