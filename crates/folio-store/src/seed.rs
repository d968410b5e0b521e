//! Demo data for an empty database.

use tracing::info;

use folio_core::{
    generate_id, Activity, Priority, Project, ProjectStatus, Subtask, Task, WorkStatus,
};

use crate::connection::ConnectionPool;
use crate::errors::Result;
use crate::repositories::ProjectRepo;

/// Insert the demo projects if no project exists yet.
///
/// Returns whether anything was inserted.
pub fn seed_if_empty(pool: &ConnectionPool) -> Result<bool> {
    let conn = pool.get()?;
    if ProjectRepo::count(&conn)? > 0 {
        info!("database already has projects, skipping demo seed");
        return Ok(false);
    }
    let projects = demo_projects();
    for project in &projects {
        ProjectRepo::insert(&conn, project)?;
    }
    info!(projects = projects.len(), "inserted demo projects");
    Ok(true)
}

/// Two sample projects with plans and activity.
pub fn demo_projects() -> Vec<Project> {
    let mut website = Project::new(generate_id("project"), "Website Redesign");
    website.status = ProjectStatus::Active;
    website.priority = Priority::High;
    website.progress = 45;
    website.last_update = Some("Homepage mockups approved".into());
    website.target_date = Some("2026-12-18".into());
    website.description = "Rebuild the marketing site around the new brand.".into();
    website.plan = vec![
        task(
            "Discovery & Research",
            WorkStatus::Completed,
            "2026-09-30",
            vec![
                subtask("Competitive analysis", WorkStatus::Completed, "2026-09-18"),
                subtask("Customer interviews", WorkStatus::Completed, "2026-09-26"),
            ],
        ),
        task(
            "Design Phase",
            WorkStatus::InProgress,
            "2026-11-06",
            vec![
                subtask("Homepage mockups", WorkStatus::Completed, "2026-10-09"),
                subtask("Product page designs", WorkStatus::InProgress, "2026-10-30"),
            ],
        ),
    ];
    website.recent_activity = vec![
        activity("2026-10-12T14:30:00Z", "Stakeholders signed off on the homepage direction"),
        activity("2026-10-09T16:15:00Z", "Homepage mockups finished"),
    ];

    let mut campaign = Project::new(generate_id("project"), "Q4 Marketing Campaign");
    campaign.status = ProjectStatus::Active;
    campaign.priority = Priority::Medium;
    campaign.progress = 30;
    campaign.last_update = Some("Content calendar drafted".into());
    campaign.target_date = Some("2026-12-31".into());
    campaign.description = "Multi-channel push for the holiday quarter.".into();
    campaign.plan = vec![task(
        "Campaign Strategy",
        WorkStatus::Completed,
        "2026-10-15",
        vec![
            subtask("Define target audience", WorkStatus::Completed, "2026-10-03"),
            subtask("Set campaign goals", WorkStatus::Completed, "2026-10-10"),
        ],
    )];
    campaign.recent_activity = vec![activity(
        "2026-10-14T16:30:00Z",
        "Aligned with sales on launch timing",
    )];

    vec![website, campaign]
}

fn task(title: &str, status: WorkStatus, due: &str, subtasks: Vec<Subtask>) -> Task {
    Task {
        id: generate_id("task"),
        title: title.into(),
        status,
        due_date: Some(due.into()),
        completed_date: (status == WorkStatus::Completed).then(|| due.to_string()),
        subtasks,
    }
}

fn subtask(title: &str, status: WorkStatus, due: &str) -> Subtask {
    Subtask {
        id: generate_id("subtask"),
        title: title.into(),
        status,
        due_date: Some(due.into()),
        completed_date: (status == WorkStatus::Completed).then(|| due.to_string()),
    }
}

fn activity(date: &str, note: &str) -> Activity {
    Activity {
        id: generate_id("activity"),
        date: date.into(),
        author: "You".into(),
        note: note.into(),
        task_context: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{new_in_memory, ConnectionConfig};
    use crate::migrations::run_migrations;

    fn pool() -> ConnectionPool {
        let pool = new_in_memory(&ConnectionConfig {
            pool_size: 1,
            ..Default::default()
        })
        .unwrap();
        let _ = run_migrations(&pool.get().unwrap()).unwrap();
        pool
    }

    #[test]
    fn seeds_once() {
        let pool = pool();
        assert!(seed_if_empty(&pool).unwrap());
        assert!(!seed_if_empty(&pool).unwrap());
        let projects = ProjectRepo::list(&pool.get().unwrap()).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Website Redesign");
        assert_eq!(projects[0].plan[1].subtasks.len(), 2);
        assert_eq!(
            projects[0].recent_activity[0].note,
            "Stakeholders signed off on the homepage direction"
        );
    }

    #[test]
    fn completed_items_carry_dates() {
        for project in demo_projects() {
            for task in &project.plan {
                assert_eq!(task.completed_date.is_some(), task.status == WorkStatus::Completed);
            }
        }
    }
}
