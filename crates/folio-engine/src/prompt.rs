//! Prompt construction for the model.
//!
//! The system prompt carries three things: the action vocabulary with the
//! fields each kind accepts, the instruction to keep actions atomic, and a
//! JSON view of the portfolio trimmed to the most recent activity entries.

use serde_json::{json, Value};

use folio_core::{Portfolio, Project};

use crate::action::ActionKind;

/// Field notes per action kind, shown to the model.
fn field_notes(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Comment => {
            "note (required), author, taskId/taskTitle and subtaskId/subtaskTitle to link the comment"
        }
        ActionKind::AddTask => {
            "title, taskId, status (todo|in-progress|completed), dueDate, completedDate, subtasks [{title, status, dueDate}]"
        }
        ActionKind::UpdateTask => {
            "taskId or taskTitle to find the task; title, status, dueDate, completedDate to change"
        }
        ActionKind::AddSubtask => {
            "taskId or taskTitle of the parent task; title, subtaskId, status, dueDate"
        }
        ActionKind::UpdateSubtask => {
            "taskId or taskTitle, subtaskId or subtaskTitle; title, status, dueDate, completedDate to change"
        }
        ActionKind::UpdateProject => {
            "status (planning|active|on-hold|completed|closed), progress (0-100), targetDate, lastUpdate"
        }
    }
}

/// Build the system prompt for one attempt.
pub fn system_prompt(portfolio: &Portfolio, activity_limit: usize, today: &str) -> String {
    let vocabulary = ActionKind::ALL
        .iter()
        .map(|k| format!("- {}: {}", k.as_str(), field_notes(*k)))
        .collect::<Vec<_>>()
        .join("\n");
    let context = serde_json::to_string_pretty(&portfolio_context(portfolio, activity_limit))
        .unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are a project portfolio assistant. Today is {today}.\n\
         \n\
         When the user asks for changes, reply with a JSON object:\n\
         {{\"response\": \"<message for the user>\", \"actions\": [ ... ]}}\n\
         If you need more information before acting, reply with\n\
         {{\"response\": \"<message>\", \"question\": \"<what you need to know>\", \"actions\": []}}\n\
         If no change is needed, reply in plain text.\n\
         \n\
         Every action has a \"type\" and a \"projectId\" or \"projectName\" that exists in the portfolio below.\n\
         Supported action types and their fields:\n\
         {vocabulary}\n\
         \n\
         Keep changes atomic: one discrete change per action. Use several actions for several changes.\n\
         Dates use YYYY-MM-DD.\n\
         \n\
         Current portfolio:\n\
         {context}"
    )
}

/// JSON view of the portfolio sent to the model.
pub fn portfolio_context(portfolio: &Portfolio, activity_limit: usize) -> Value {
    Value::Array(
        portfolio
            .projects
            .iter()
            .map(|p| project_context(p, activity_limit))
            .collect(),
    )
}

fn project_context(project: &Project, activity_limit: usize) -> Value {
    let recent: Vec<Value> = project
        .recent_activity
        .iter()
        .take(activity_limit)
        .map(|a| {
            json!({
                "date": a.date,
                "author": a.author,
                "note": a.note,
            })
        })
        .collect();

    json!({
        "id": project.id,
        "name": project.name,
        "status": project.status,
        "progress": project.progress,
        "priority": project.priority,
        "lastUpdate": project.last_update,
        "targetDate": project.target_date,
        "plan": project.plan,
        "recentActivity": recent,
    })
}

/// System message appended after an attempt whose actions failed validation.
pub fn retry_message(errors: &[String]) -> String {
    format!(
        "Your previous response could not be applied because {}. \
         Use only these action types: {}. \
         Each action must include a valid projectId or projectName that exists in the provided portfolio.",
        errors.join("; "),
        ActionKind::vocabulary()
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
