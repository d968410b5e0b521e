//! Project repository: the `projects` table plus whole-project inserts.

use rusqlite::{params, Connection, OptionalExtension};

use folio_core::{now_iso, Priority, Project, ProjectStatus};

use super::{parse_column, ActivityRepo, TaskRepo};
use crate::errors::{Result, StoreError};

/// Project repository.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a project with its plan and activity feed in one transaction.
    pub fn insert(conn: &Connection, project: &Project) -> Result<()> {
        let tx = conn.unchecked_transaction()?;
        let order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM projects",
            [],
            |row| row.get(0),
        )?;
        let _ = tx.execute(
            "INSERT INTO projects
               (id, name, status, priority, progress, last_update, target_date,
                description, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                project.id,
                project.name,
                project.status.as_str(),
                project.priority.as_str(),
                project.progress,
                project.last_update,
                project.target_date,
                project.description,
                order,
                now_iso()
            ],
        )?;
        for task in &project.plan {
            TaskRepo::insert_rows(&tx, &project.id, task)?;
        }
        // Oldest first, so the newest entry ends up with the highest rowid.
        for activity in project.recent_activity.iter().rev() {
            ActivityRepo::insert(&tx, &project.id, activity)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Overwrite project-level fields. Plan and activity are left alone.
    pub fn update(conn: &Connection, project: &Project) -> Result<()> {
        let changed = conn.execute(
            "UPDATE projects
             SET name = ?2, status = ?3, priority = ?4, progress = ?5,
                 last_update = ?6, target_date = ?7, description = ?8
             WHERE id = ?1",
            params![
                project.id,
                project.name,
                project.status.as_str(),
                project.priority.as_str(),
                project.progress,
                project.last_update,
                project.target_date,
                project.description
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("project {}", project.id)));
        }
        Ok(())
    }

    /// Number of projects.
    pub fn count(conn: &Connection) -> Result<u64> {
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    /// Fetch one project, including plan and activity.
    pub fn get(conn: &Connection, project_id: &str) -> Result<Option<Project>> {
        let project = conn
            .query_row(
                &format!("{SELECT_PROJECT} WHERE id = ?1"),
                params![project_id],
                Self::map_row,
            )
            .optional()?;
        project.map(|p| Self::hydrate(conn, p)).transpose()
    }

    /// Every project in insertion order, including plan and activity.
    pub fn list(conn: &Connection) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(&format!("{SELECT_PROJECT} ORDER BY sort_order, rowid"))?;
        let projects = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        projects.into_iter().map(|p| Self::hydrate(conn, p)).collect()
    }

    fn hydrate(conn: &Connection, mut project: Project) -> Result<Project> {
        project.plan = TaskRepo::list(conn, &project.id)?;
        project.recent_activity = ActivityRepo::list(conn, &project.id)?;
        Ok(project)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
        let status: String = row.get(2)?;
        let priority: String = row.get(3)?;
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            status: parse_column(2, &status, ProjectStatus::parse_lenient)?,
            priority: parse_column(3, &priority, Priority::parse_lenient)?,
            progress: row.get(4)?,
            last_update: row.get(5)?,
            target_date: row.get(6)?,
            description: row.get(7)?,
            plan: Vec::new(),
            recent_activity: Vec::new(),
        })
    }
}

const SELECT_PROJECT: &str = "SELECT id, name, status, priority, progress, last_update,
        target_date, description
 FROM projects";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use folio_core::{Activity, Task, WorkStatus};

    use super::*;
    use crate::testutil::migrated;

    fn full_project() -> Project {
        let mut project = Project::new("p1", "Alpha");
        project.status = ProjectStatus::Active;
        project.priority = Priority::High;
        project.progress = 45;
        project.last_update = Some("Mockups done".into());
        project.target_date = Some("2026-12-20".into());
        project.description = "Site overhaul".into();
        project.plan.push(Task {
            id: "t1".into(),
            title: "Design".into(),
            status: WorkStatus::InProgress,
            due_date: None,
            completed_date: None,
            subtasks: Vec::new(),
        });
        for (id, note) in [("a2", "newer"), ("a1", "older")] {
            project.recent_activity.push(Activity {
                id: id.into(),
                date: "2026-10-16T10:00:00Z".into(),
                author: "Dana".into(),
                note: note.into(),
                task_context: None,
            });
        }
        project
    }

    #[test]
    fn insert_then_get_round_trips() {
        let conn = migrated();
        let project = full_project();
        ProjectRepo::insert(&conn, &project).unwrap();
        assert_eq!(ProjectRepo::get(&conn, "p1").unwrap(), Some(project));
        assert_eq!(ProjectRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let conn = migrated();
        ProjectRepo::insert(&conn, &Project::new("b", "Beta")).unwrap();
        ProjectRepo::insert(&conn, &Project::new("a", "Alpha")).unwrap();
        let names: Vec<_> = ProjectRepo::list(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Alpha"]);
    }

    #[test]
    fn update_changes_fields_only() {
        let conn = migrated();
        ProjectRepo::insert(&conn, &full_project()).unwrap();
        let mut changed = Project::new("p1", "Alpha");
        changed.status = ProjectStatus::OnHold;
        changed.progress = 60;
        ProjectRepo::update(&conn, &changed).unwrap();

        let stored = ProjectRepo::get(&conn, "p1").unwrap().unwrap();
        assert_eq!(stored.status, ProjectStatus::OnHold);
        assert_eq!(stored.progress, 60);
        assert_eq!(stored.plan.len(), 1);
        assert_eq!(stored.recent_activity.len(), 2);
    }

    #[test]
    fn update_missing_project_is_not_found() {
        let conn = migrated();
        assert!(matches!(
            ProjectRepo::update(&conn, &Project::new("nope", "Nope")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_status_in_row_is_an_error() {
        let conn = migrated();
        let _ = conn
            .execute(
                "INSERT INTO projects (id, name, status, created_at) VALUES ('p1', 'Alpha', 'exploded', 'now')",
                [],
            )
            .unwrap();
        assert!(matches!(ProjectRepo::get(&conn, "p1"), Err(StoreError::Sqlite(_))));
    }
}
