//! Reference resolution over one working snapshot.
//!
//! Every lookup is two-pass: exact id match first, then case-insensitive
//! exact name/title match. Both given references are tried in each pass,
//! so a model that puts a name into `projectId` still resolves. There is
//! no fuzzy matching. Misses return `None`; callers skip, never panic.

use folio_core::{Portfolio, Project, Task};

/// A loose reference: an id and/or a display name.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lookup<'a> {
    /// Id candidate.
    pub id: Option<&'a str>,
    /// Name or title candidate.
    pub name: Option<&'a str>,
}

impl<'a> Lookup<'a> {
    /// Build from optional owned strings.
    pub fn new(id: Option<&'a String>, name: Option<&'a String>) -> Self {
        Self {
            id: id.map(String::as_str),
            name: name.map(String::as_str),
        }
    }

    /// Whether there is nothing to look up.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }

    /// Human-readable form for skip messages.
    pub fn describe(&self) -> &'a str {
        self.id.or(self.name).unwrap_or("")
    }

    fn candidates(&self) -> impl Iterator<Item = &'a str> {
        self.id.into_iter().chain(self.name)
    }

    /// Index of the first item whose id or label matches, id pass first.
    fn position<T>(
        &self,
        items: &[T],
        id_of: impl Fn(&T) -> &str,
        label_of: impl Fn(&T) -> &str,
    ) -> Option<usize> {
        self.candidates()
            .find_map(|c| items.iter().position(|item| id_of(item) == c))
            .or_else(|| {
                self.candidates().find_map(|c| {
                    items
                        .iter()
                        .position(|item| same_text(label_of(item), c))
                })
            })
    }
}

fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Index of the project matching `lookup`.
pub fn project_index(portfolio: &Portfolio, lookup: Lookup<'_>) -> Option<usize> {
    lookup.position(&portfolio.projects, |p| p.id.as_str(), |p| p.name.as_str())
}

/// The project matching `lookup`.
pub fn resolve_project<'p>(portfolio: &'p Portfolio, lookup: Lookup<'_>) -> Option<&'p Project> {
    project_index(portfolio, lookup).map(|i| &portfolio.projects[i])
}

/// Index of the task matching `lookup` within `project.plan`.
pub fn task_index(project: &Project, lookup: Lookup<'_>) -> Option<usize> {
    lookup.position(&project.plan, |t| t.id.as_str(), |t| t.title.as_str())
}

/// The task matching `lookup`.
pub fn resolve_task<'p>(project: &'p Project, lookup: Lookup<'_>) -> Option<&'p Task> {
    task_index(project, lookup).map(|i| &project.plan[i])
}

/// Index of the subtask matching `lookup` within `task.subtasks`.
pub fn subtask_index(task: &Task, lookup: Lookup<'_>) -> Option<usize> {
    lookup.position(&task.subtasks, |s| s.id.as_str(), |s| s.title.as_str())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
