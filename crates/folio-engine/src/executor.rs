//! Action executor.
//!
//! [`apply_actions`] clones the snapshot once and threads the working copy
//! through every action in order, so later actions see earlier ones. Each
//! action yields exactly one [`ActionResult`]: applied actions carry the
//! inverse delta, actions whose project, task or subtask cannot be found
//! carry none and are labeled as skipped. Nothing here touches the store.

use tracing::debug;

use folio_core::{
    generate_id, now_iso, today, Activity, Portfolio, Project, Subtask, Task, TaskContext,
    WorkStatus,
};

use crate::action::{
    Action, ActionKind, AddSubtaskAction, AddTaskAction, CommentAction, NewSubtask,
    UpdateProjectAction, UpdateSubtaskAction, UpdateTaskAction, WorkItemChanges,
};
use crate::delta::{Delta, ProjectFields, WorkItemFields, WorkItemMut};
use crate::ledger::ActionResult;
use crate::persistence::{forward_op, PersistOp};
use crate::resolve::{project_index, subtask_index, task_index, Lookup};

const DEFAULT_TASK_TITLE: &str = "New task";
const DEFAULT_SUBTASK_TITLE: &str = "New subtask";

/// Per-batch values stamped onto created and updated entities.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Author for comments that do not name one.
    pub author: String,
    /// ISO timestamp for new activity entries.
    pub timestamp: String,
    /// `YYYY-MM-DD` used for completion dates.
    pub today: String,
}

impl ExecutionContext {
    /// Context stamped with the current time.
    pub fn now(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            timestamp: now_iso(),
            today: today(),
        }
    }
}

/// Outcome of applying one batch.
#[derive(Clone, Debug)]
pub struct Execution {
    /// The mutated working copy, not yet committed.
    pub working: Portfolio,
    /// One result per submitted action, in submission order.
    pub results: Vec<ActionResult>,
    /// Persistence calls mirroring the batch, in application order. Each
    /// carries its entity as it stood right after its own action.
    pub ops: Vec<PersistOp>,
}

impl Execution {
    /// Every delta produced, in application order.
    pub fn deltas(&self) -> impl Iterator<Item = &Delta> {
        self.results.iter().flat_map(|r| r.deltas.iter())
    }

    /// Whether any action changed the working copy.
    pub fn changed(&self) -> bool {
        self.results.iter().any(|r| !r.deltas.is_empty())
    }
}

/// Apply `actions` in order to a clone of `snapshot`.
pub fn apply_actions(snapshot: &Portfolio, actions: &[Action], ctx: &ExecutionContext) -> Execution {
    let mut working = snapshot.clone();
    let mut results = Vec::with_capacity(actions.len());
    let mut ops = Vec::new();
    for action in actions {
        let result = apply_action(&mut working, action, ctx);
        ops.extend(result.deltas.iter().filter_map(|d| forward_op(d, &working)));
        results.push(result);
    }
    Execution {
        working,
        results,
        ops,
    }
}

/// Apply a single action in place.
pub fn apply_action(portfolio: &mut Portfolio, action: &Action, ctx: &ExecutionContext) -> ActionResult {
    let kind = action.kind();
    let reference = action.project();
    let lookup = Lookup::new(reference.project_id.as_ref(), reference.project_name.as_ref());
    let Some(index) = project_index(portfolio, lookup) else {
        return skip(kind, format!("project \"{}\" not found", reference.describe()));
    };
    let project = &mut portfolio.projects[index];

    let result = match action {
        Action::Comment(a) => comment(project, a, ctx),
        Action::AddTask(a) => add_task(project, a, ctx),
        Action::UpdateTask(a) => update_task(project, a, ctx),
        Action::AddSubtask(a) => add_subtask(project, a, ctx),
        Action::UpdateSubtask(a) => update_subtask(project, a, ctx),
        Action::UpdateProject(a) => update_project(project, a),
    };
    if !result.deltas.is_empty() {
        debug!(action = %kind, project_id = %project.id, detail = %result.detail, "action applied");
    }
    result
}

// ── Per-kind handlers ───────────────────────────────────────────────────────

fn comment(project: &mut Project, a: &CommentAction, ctx: &ExecutionContext) -> ActionResult {
    let Some(note) = a.note.as_deref() else {
        return skip(
            ActionKind::Comment,
            format!("no note given for {}", project.name),
        );
    };

    let task_context = comment_context(project, a);
    let id = generate_id("activity");
    let detail = match &task_context {
        Some(link) => format!(
            "Commented on {} ({}): {note}",
            project.name,
            link.subtask_title.as_deref().unwrap_or(&link.task_title)
        ),
        None => format!("Commented on {}: {note}", project.name),
    };

    project.recent_activity.insert(
        0,
        Activity {
            id: id.clone(),
            date: ctx.timestamp.clone(),
            author: a.author.clone().unwrap_or_else(|| ctx.author.clone()),
            note: note.to_string(),
            task_context,
        },
    );

    ActionResult::applied(
        "Comment added",
        detail,
        vec![Delta::RemoveActivity {
            project_id: project.id.clone(),
            activity_id: id,
        }],
    )
}

/// Link a comment to its task/subtask when the references resolve.
fn comment_context(project: &Project, a: &CommentAction) -> Option<TaskContext> {
    let task_lookup = Lookup::new(a.task_id.as_ref(), a.task_title.as_ref());
    if task_lookup.is_empty() {
        return None;
    }
    let task = &project.plan[task_index(project, task_lookup)?];
    let subtask = subtask_index(task, Lookup::new(a.subtask_id.as_ref(), a.subtask_title.as_ref()))
        .map(|i| &task.subtasks[i]);
    Some(TaskContext {
        task_id: task.id.clone(),
        subtask_id: subtask.map(|s| s.id.clone()),
        task_title: task.title.clone(),
        subtask_title: subtask.map(|s| s.title.clone()),
    })
}

fn add_task(project: &mut Project, a: &AddTaskAction, ctx: &ExecutionContext) -> ActionResult {
    let id = pick_id(a.task_id.as_deref(), "task", |id| project.task(id).is_some());
    let status = a.status.unwrap_or_default();

    let mut subtasks: Vec<Subtask> = Vec::with_capacity(a.subtasks.len());
    for draft in &a.subtasks {
        let subtask_id = pick_id(draft.id.as_deref(), "subtask", |id| {
            subtask_id_taken(project, id) || subtasks.iter().any(|s| s.id == id)
        });
        subtasks.push(new_subtask(subtask_id, draft, ctx));
    }

    let task = Task {
        id: id.clone(),
        title: a.title.clone().unwrap_or_else(|| DEFAULT_TASK_TITLE.to_string()),
        status,
        due_date: a.due_date.clone(),
        completed_date: creation_completed_date(status, a.completed_date.as_ref(), ctx),
        subtasks,
    };

    let mut detail = format!("Added task \"{}\" to {}", task.title, project.name);
    match task.subtasks.len() {
        0 => {}
        1 => detail.push_str(" with 1 subtask"),
        n => detail.push_str(&format!(" with {n} subtasks")),
    }
    project.plan.push(task);

    ActionResult::applied(
        "Task added",
        detail,
        vec![Delta::RemoveTask {
            project_id: project.id.clone(),
            task_id: id,
        }],
    )
}

fn update_task(project: &mut Project, a: &UpdateTaskAction, ctx: &ExecutionContext) -> ActionResult {
    let lookup = Lookup::new(a.task_id.as_ref(), a.task_title.as_ref());
    let Some(index) = task_index(project, lookup) else {
        return skip(
            ActionKind::UpdateTask,
            format!("task \"{}\" not found in {}", lookup.describe(), project.name),
        );
    };

    let project_id = project.id.clone();
    let project_name = project.name.clone();
    let task = &mut project.plan[index];
    let old_title = task.title.clone();
    let (previous, clauses) = diff_apply(WorkItemMut::from(&mut *task), &a.changes, ctx);

    if clauses.is_empty() {
        return ActionResult::applied(
            "Task unchanged",
            format!("No changes to task \"{old_title}\" in {project_name}"),
            Vec::new(),
        );
    }

    ActionResult::applied(
        "Task updated",
        format!(
            "Updated task \"{old_title}\" in {project_name}: {}",
            clauses.join(", ")
        ),
        vec![Delta::RestoreTask {
            project_id,
            task_id: task.id.clone(),
            previous,
        }],
    )
}

fn add_subtask(project: &mut Project, a: &AddSubtaskAction, ctx: &ExecutionContext) -> ActionResult {
    let lookup = Lookup::new(a.task_id.as_ref(), a.task_title.as_ref());
    let Some(index) = task_index(project, lookup) else {
        return skip(
            ActionKind::AddSubtask,
            format!("task \"{}\" not found in {}", lookup.describe(), project.name),
        );
    };

    let draft = a.new_subtask();
    let id = pick_id(draft.id.as_deref(), "subtask", |id| subtask_id_taken(project, id));
    let subtask = new_subtask(id.clone(), &draft, ctx);

    let project_id = project.id.clone();
    let detail = format!(
        "Added subtask \"{}\" to \"{}\" in {}",
        subtask.title, project.plan[index].title, project.name
    );
    let task = &mut project.plan[index];
    task.subtasks.push(subtask);

    ActionResult::applied(
        "Subtask added",
        detail,
        vec![Delta::RemoveSubtask {
            project_id,
            task_id: task.id.clone(),
            subtask_id: id,
        }],
    )
}

fn update_subtask(
    project: &mut Project,
    a: &UpdateSubtaskAction,
    ctx: &ExecutionContext,
) -> ActionResult {
    let task_lookup = Lookup::new(a.task_id.as_ref(), a.task_title.as_ref());
    let Some(task_idx) = task_index(project, task_lookup) else {
        return skip(
            ActionKind::UpdateSubtask,
            format!("task \"{}\" not found in {}", task_lookup.describe(), project.name),
        );
    };
    let subtask_lookup = Lookup::new(a.subtask_id.as_ref(), a.subtask_title.as_ref());
    let Some(sub_idx) = subtask_index(&project.plan[task_idx], subtask_lookup) else {
        return skip(
            ActionKind::UpdateSubtask,
            format!(
                "subtask \"{}\" not found in task \"{}\"",
                subtask_lookup.describe(),
                project.plan[task_idx].title
            ),
        );
    };

    let project_id = project.id.clone();
    let project_name = project.name.clone();
    let task = &mut project.plan[task_idx];
    let task_id = task.id.clone();
    let task_title = task.title.clone();
    let subtask = &mut task.subtasks[sub_idx];
    let old_title = subtask.title.clone();
    let (previous, clauses) = diff_apply(WorkItemMut::from(&mut *subtask), &a.changes, ctx);

    if clauses.is_empty() {
        return ActionResult::applied(
            "Subtask unchanged",
            format!("No changes to subtask \"{old_title}\" in \"{task_title}\" ({project_name})"),
            Vec::new(),
        );
    }

    ActionResult::applied(
        "Subtask updated",
        format!(
            "Updated subtask \"{old_title}\" in \"{task_title}\" ({project_name}): {}",
            clauses.join(", ")
        ),
        vec![Delta::RestoreSubtask {
            project_id,
            task_id,
            subtask_id: subtask.id.clone(),
            previous,
        }],
    )
}

fn update_project(project: &mut Project, a: &UpdateProjectAction) -> ActionResult {
    let mut previous = ProjectFields::default();
    let mut clauses = Vec::new();

    if let Some(status) = a.status {
        if status != project.status {
            clauses.push(format!("status {} → {status}", project.status));
            previous.status = Some(project.status);
            project.status = status;
        }
    }
    if let Some(raw) = a.progress {
        let progress = clamp_progress(raw);
        if progress != project.progress {
            clauses.push(format!("progress {}% → {progress}%", project.progress));
            previous.progress = Some(project.progress);
            project.progress = progress;
        }
    }
    if let Some(date) = &a.target_date {
        if project.target_date.as_ref() != Some(date) {
            clauses.push(format!(
                "targetDate {} → {date}",
                show(project.target_date.as_deref())
            ));
            previous.target_date = Some(project.target_date.replace(date.clone()));
        }
    }
    if let Some(text) = &a.last_update {
        if project.last_update.as_ref() != Some(text) {
            clauses.push(format!("lastUpdate → \"{text}\""));
            previous.last_update = Some(project.last_update.replace(text.clone()));
        }
    }

    if previous.is_empty() {
        return ActionResult::applied(
            "Project unchanged",
            format!("No changes to {}", project.name),
            Vec::new(),
        );
    }

    ActionResult::applied(
        "Project updated",
        format!("Updated {}: {}", project.name, clauses.join(", ")),
        vec![Delta::RestoreProject {
            project_id: project.id.clone(),
            previous,
        }],
    )
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn skip(kind: ActionKind, reason: String) -> ActionResult {
    debug!(action = %kind, reason = %reason, "action skipped");
    ActionResult::skipped(format!("Skipped {kind}"), format!("Skipped {kind}: {reason}"))
}

/// Use the requested id unless it is absent or already taken.
fn pick_id(requested: Option<&str>, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    match requested {
        Some(id) if !taken(id) => id.to_string(),
        _ => generate_id(prefix),
    }
}

fn subtask_id_taken(project: &Project, id: &str) -> bool {
    project.plan.iter().any(|t| t.subtask(id).is_some())
}

fn new_subtask(id: String, draft: &NewSubtask, ctx: &ExecutionContext) -> Subtask {
    let status = draft.status.unwrap_or_default();
    Subtask {
        id,
        title: draft
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBTASK_TITLE.to_string()),
        status,
        due_date: draft.due_date.clone(),
        completed_date: creation_completed_date(status, draft.completed_date.as_ref(), ctx),
    }
}

fn creation_completed_date(
    status: WorkStatus,
    explicit: Option<&String>,
    ctx: &ExecutionContext,
) -> Option<String> {
    explicit
        .cloned()
        .or_else(|| (status == WorkStatus::Completed).then(|| ctx.today.clone()))
}

/// Apply the differing fields of `changes` to `item`, one clause each.
///
/// Returns the prior values of exactly the fields that changed. A
/// transition into `completed` stamps today's date and a transition out
/// of it clears the date, unless `completedDate` is given explicitly.
fn diff_apply(
    item: WorkItemMut<'_>,
    changes: &WorkItemChanges,
    ctx: &ExecutionContext,
) -> (WorkItemFields, Vec<String>) {
    let mut previous = WorkItemFields::default();
    let mut clauses = Vec::new();

    if let Some(title) = &changes.title {
        if *title != *item.title {
            clauses.push(format!("title \"{}\" → \"{title}\"", item.title));
            previous.title = Some(std::mem::replace(item.title, title.clone()));
        }
    }

    let mut stamped = None;
    if let Some(status) = changes.status {
        if status != *item.status {
            clauses.push(format!("status {} → {status}", item.status));
            if changes.completed_date.is_none() {
                if status == WorkStatus::Completed && item.completed_date.is_none() {
                    stamped = Some(Some(ctx.today.clone()));
                } else if *item.status == WorkStatus::Completed && item.completed_date.is_some() {
                    stamped = Some(None);
                }
            }
            previous.status = Some(std::mem::replace(item.status, status));
        }
    }

    if let Some(date) = &changes.due_date {
        if item.due_date.as_ref() != Some(date) {
            clauses.push(format!("dueDate {} → {date}", show(item.due_date.as_deref())));
            previous.due_date = Some(item.due_date.replace(date.clone()));
        }
    }

    let completed = changes.completed_date.clone().map(Some).or(stamped);
    if let Some(completed) = completed {
        if *item.completed_date != completed {
            clauses.push(format!(
                "completedDate {} → {}",
                show(item.completed_date.as_deref()),
                show(completed.as_deref())
            ));
            previous.completed_date = Some(std::mem::replace(item.completed_date, completed));
        }
    }

    (previous, clauses)
}

fn show(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
