//! End-to-end session tests against a scripted model and the in-memory store.

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use folio_core::{Activity, Portfolio, Project, Subtask, Task, WorkStatus};
use folio_engine::{
    apply_actions, validate, ChatSession, EngineError, ExecutionContext, InMemoryStore,
    MessageStatus, Persistence, PortfolioStore, SessionConfig, Snapshot, TurnState,
};
use folio_llm::ScriptedModel;

// ── Fixtures ────────────────────────────────────────────────────────────────

fn portfolio() -> Portfolio {
    let mut alpha = Project::new("p1", "Website Refresh");
    alpha.plan.push(Task {
        id: "t1".into(),
        title: "Design".into(),
        status: WorkStatus::Todo,
        due_date: None,
        completed_date: None,
        subtasks: vec![Subtask {
            id: "s1".into(),
            title: "Wireframes".into(),
            status: WorkStatus::Todo,
            due_date: None,
            completed_date: None,
        }],
    });
    let beta = Project::new("p2", "Mobile App");
    Portfolio::new(vec![alpha, beta])
}

/// Records every persistence call by name. Calls starting with `reject`
/// are recorded and then fail.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
    reject: Mutex<Option<&'static str>>,
}

impl Recorder {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn reject(&self, prefix: &'static str) {
        *self.reject.lock() = Some(prefix);
    }

    fn log(&self, call: String) -> folio_engine::Result<()> {
        let rejected = self.reject.lock().is_some_and(|prefix| call.starts_with(prefix));
        self.calls.lock().push(call);
        if rejected {
            return Err(EngineError::Persistence("disk full".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Persistence for Recorder {
    async fn create_project(&self, project: &Project) -> folio_engine::Result<()> {
        self.log(format!("create_project {}", project.id))
    }
    async fn update_project(&self, project: &Project) -> folio_engine::Result<()> {
        self.log(format!("update_project {}", project.id))
    }
    async fn add_activity(&self, project_id: &str, activity: &Activity) -> folio_engine::Result<()> {
        self.log(format!("add_activity {project_id} {}", activity.note))
    }
    async fn delete_activity(&self, project_id: &str, _activity_id: &str) -> folio_engine::Result<()> {
        self.log(format!("delete_activity {project_id}"))
    }
    async fn add_task(&self, project_id: &str, task: &Task) -> folio_engine::Result<()> {
        self.log(format!("add_task {project_id} {}", task.title))
    }
    async fn update_task(&self, project_id: &str, task: &Task) -> folio_engine::Result<()> {
        self.log(format!("update_task {project_id} {} {}", task.id, task.status))
    }
    async fn delete_task(&self, project_id: &str, task_id: &str) -> folio_engine::Result<()> {
        self.log(format!("delete_task {project_id} {task_id}"))
    }
    async fn add_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> folio_engine::Result<()> {
        self.log(format!("add_subtask {project_id} {task_id} {}", subtask.title))
    }
    async fn update_subtask(&self, project_id: &str, task_id: &str, subtask: &Subtask) -> folio_engine::Result<()> {
        self.log(format!("update_subtask {project_id} {task_id} {}", subtask.id))
    }
    async fn delete_subtask(&self, project_id: &str, task_id: &str, subtask_id: &str) -> folio_engine::Result<()> {
        self.log(format!("delete_subtask {project_id} {task_id} {subtask_id}"))
    }
}

struct Harness {
    session: ChatSession,
    model: Arc<ScriptedModel>,
    store: Arc<InMemoryStore>,
    recorder: Arc<Recorder>,
}

fn harness(replies: &[&str]) -> Harness {
    let model = Arc::new(ScriptedModel::new(replies.iter().copied()));
    let store = Arc::new(InMemoryStore::new(portfolio()));
    let recorder = Arc::new(Recorder::default());
    let session = ChatSession::new(
        model.clone(),
        store.clone(),
        recorder.clone(),
        SessionConfig::default(),
    );
    Harness {
        session,
        model,
        store,
        recorder,
    }
}

fn reply(actions: serde_json::Value) -> String {
    json!({ "response": "On it.", "actions": actions }).to_string()
}

fn task_status(store: &InMemoryStore) -> WorkStatus {
    store.snapshot().portfolio.projects[0].plan[0].status
}

// ── Apply and undo ──────────────────────────────────────────────────────────

#[tokio::test]
async fn update_task_applies_and_rolls_back() {
    let raw = reply(json!([
        { "type": "update_task", "projectId": "p1", "taskId": "t1", "status": "in-progress" }
    ]));
    let mut h = harness(&[raw.as_str()]);

    let message = h.session.send_message("Start the design task").await.unwrap();
    assert_eq!(message.status, MessageStatus::Completed);
    assert_eq!(message.attempts, 1);
    assert_eq!(message.version, 1);
    assert_eq!(message.results.len(), 1);
    assert!(message.results[0].detail.contains("status todo → in-progress"));
    assert_eq!(task_status(&h.store), WorkStatus::InProgress);

    let delta = serde_json::to_value(&message.results[0].deltas[0]).unwrap();
    assert_eq!(delta["type"], "restore_task");
    assert_eq!(delta["projectId"], "p1");
    assert_eq!(delta["taskId"], "t1");
    assert_eq!(delta["previous"], json!({ "status": "todo" }));

    assert!(h.session.undo_action(&message.id, 0).await.unwrap());
    assert_eq!(task_status(&h.store), WorkStatus::Todo);
    assert_eq!(h.store.version(), 2);
    assert!(h.session.action_results(&message.id).unwrap()[0].undone);
}

#[tokio::test]
async fn second_undo_is_a_no_op() {
    let raw = reply(json!([
        { "type": "update_task", "projectId": "p1", "taskId": "t1", "status": "completed" }
    ]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("Finish design").await.unwrap();

    assert!(h.session.undo_action(&message.id, 0).await.unwrap());
    let after_first = h.store.snapshot();
    assert!(!h.session.undo_action(&message.id, 0).await.unwrap());
    assert_eq!(h.store.snapshot(), after_first);
    assert!(h.session.ledger().pending().is_empty());
}

#[tokio::test]
async fn undo_out_of_range_and_unknown_message() {
    let raw = reply(json!([{ "type": "comment", "projectId": "p1", "note": "hi" }]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("note it").await.unwrap();

    assert!(!h.session.undo_action(&message.id, 5).await.unwrap());
    let err = h.session.undo_action("msg-missing", 0).await.unwrap_err();
    assert_matches!(err, EngineError::UnknownMessage(id) if id == "msg-missing");
}

#[tokio::test]
async fn undo_one_action_leaves_siblings_alone() {
    let raw = reply(json!([
        { "type": "comment", "projectId": "p1", "note": "kickoff" },
        { "type": "update_project", "projectName": "mobile app", "progress": 40 }
    ]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("log and bump").await.unwrap();
    assert_eq!(h.store.snapshot().portfolio.projects[1].progress, 40);

    assert!(h.session.undo_action(&message.id, 0).await.unwrap());
    let live = h.store.snapshot().portfolio;
    assert!(live.projects[0].recent_activity.is_empty());
    assert_eq!(live.projects[1].progress, 40);
}

#[tokio::test]
async fn undoing_an_older_update_keeps_a_later_edit_to_the_same_task() {
    let start = reply(json!([
        { "type": "update_task", "projectId": "p1", "taskId": "t1", "status": "in-progress" }
    ]));
    let rename = reply(json!([
        { "type": "update_task", "projectId": "p1", "taskId": "t1", "title": "UX Design", "dueDate": "2026-12-01" }
    ]));
    let mut h = harness(&[start.as_str(), rename.as_str()]);
    let first = h.session.send_message("Start design").await.unwrap();
    let second = h.session.send_message("Rename it and set a due date").await.unwrap();
    assert_eq!(second.results[0].deltas.len(), 1);

    assert!(h.session.undo_action(&first.id, 0).await.unwrap());
    let task = h.store.snapshot().portfolio.projects[0].plan[0].clone();
    assert_eq!(task.status, WorkStatus::Todo);
    assert_eq!(task.title, "UX Design");
    assert_eq!(task.due_date.as_deref(), Some("2026-12-01"));

    // The later message still undoes cleanly on its own.
    assert!(h.session.undo_action(&second.id, 0).await.unwrap());
    let task = h.store.snapshot().portfolio.projects[0].plan[0].clone();
    assert_eq!(task.title, "Design");
    assert!(task.due_date.is_none());
    assert_eq!(task.status, WorkStatus::Todo);
}

// ── Validation and retry ────────────────────────────────────────────────────

#[test]
fn unsupported_type_is_reported_and_siblings_survive() {
    let payload = json!([
        { "type": "comment", "projectId": "p1", "note": "hi" },
        { "type": "delete_everything", "projectId": "p1" }
    ]);
    let snapshot = portfolio();
    let validation = validate(&payload, &snapshot);
    assert_eq!(validation.valid_actions.len(), 1);
    assert_eq!(validation.errors.len(), 1);
    assert!(validation.errors[0].contains("delete_everything"));

    let ctx = ExecutionContext::now("AI Assistant");
    let execution = apply_actions(&snapshot, &validation.valid_actions, &ctx);
    assert_eq!(execution.results.len(), 1);
    assert_eq!(execution.results[0].label, "Comment added");
    assert_eq!(execution.working.projects[0].recent_activity.len(), 1);
    assert_eq!(execution.working.projects[0].recent_activity[0].note, "hi");
}

#[tokio::test]
async fn retry_converges_on_second_attempt() {
    let bad = reply(json!([
        { "type": "comment", "projectId": "p1", "note": "hi" },
        { "type": "delete_everything", "projectId": "p1" }
    ]));
    let good = reply(json!([{ "type": "comment", "projectId": "p1", "note": "hi" }]));
    let mut h = harness(&[bad.as_str(), good.as_str()]);

    let message = h.session.send_message("say hi").await.unwrap();
    assert_eq!(message.status, MessageStatus::Completed);
    assert_eq!(message.attempts, 2);
    assert_eq!(message.results.len(), 1);
    assert_eq!(h.model.call_count(), 2);
    assert_eq!(h.store.snapshot().portfolio.projects[0].recent_activity.len(), 1);
}

#[tokio::test]
async fn exhausted_retries_commit_nothing() {
    let bad = reply(json!([{ "type": "update_task", "projectId": "nope", "taskId": "t1" }]));
    let mut h = harness(&[bad.as_str(), bad.as_str(), bad.as_str()]);
    let before = h.store.snapshot();

    let message = h.session.send_message("do something").await.unwrap();
    assert_eq!(message.status, MessageStatus::Failed);
    assert_eq!(message.attempts, 3);
    assert!(message.results.is_empty());
    let error = message.error.unwrap();
    assert!(error.contains("attempt 1: action 0 (update_task) references unknown project"));
    assert!(error.contains("attempt 3: "));
    assert_eq!(h.store.snapshot(), before);
    assert!(h.session.ledger().is_empty());
    assert!(h.recorder.calls().is_empty());
    assert_eq!(h.session.state(), TurnState::Idle);
}

#[tokio::test]
async fn provider_failure_is_a_failed_message() {
    // An empty script makes the model return an error.
    let mut h = harness(&[]);
    let message = h.session.send_message("hello").await.unwrap();
    assert_eq!(message.status, MessageStatus::Failed);
    assert_eq!(message.attempts, 0);
    assert_eq!(h.model.call_count(), 1);
    assert_eq!(h.store.version(), 0);
}

// ── Ordering and referential safety ─────────────────────────────────────────

#[tokio::test]
async fn later_actions_see_earlier_ones() {
    let raw = reply(json!([
        { "type": "add_task", "projectId": "p2", "title": "Beta launch" },
        { "type": "add_subtask", "projectId": "p2", "taskTitle": "beta launch", "title": "Store listing" }
    ]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("plan the launch").await.unwrap();

    let labels: Vec<_> = message.results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Task added", "Subtask added"]);
    let live = h.store.snapshot().portfolio;
    assert_eq!(live.projects[1].plan[0].subtasks[0].title, "Store listing");
}

#[tokio::test]
async fn missing_task_is_skipped_without_blocking_batch() {
    let raw = reply(json!([
        { "type": "update_task", "projectId": "p1", "taskTitle": "Nonexistent", "status": "completed" },
        { "type": "update_subtask", "projectId": "p1", "taskId": "t1", "subtaskId": "s1", "status": "completed" }
    ]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("wrap up").await.unwrap();

    assert_eq!(message.results.len(), 2);
    assert!(message.results[0].deltas.is_empty());
    assert!(message.results[0].label.starts_with("Skipped"));
    assert_eq!(message.results[1].label, "Subtask updated");

    let live = h.store.snapshot().portfolio;
    assert_eq!(live.projects[0].plan[0].status, WorkStatus::Todo);
    assert_eq!(live.projects[0].plan[0].subtasks[0].status, WorkStatus::Completed);

    assert!(!h.session.undo_action(&message.id, 0).await.unwrap());
}

// ── Clarification ───────────────────────────────────────────────────────────

#[tokio::test]
async fn clarifying_question_then_answer() {
    let question = json!({
        "response": "Which project do you mean?",
        "question": "Website Refresh or Mobile App?",
        "actions": []
    })
    .to_string();
    let follow_up = reply(json!([
        { "type": "update_project", "projectId": "p2", "status": "on-hold" }
    ]));
    let mut h = harness(&[question.as_str(), follow_up.as_str()]);

    let asked = h.session.send_message("flag the project").await.unwrap();
    assert_eq!(asked.status, MessageStatus::AwaitingUser);
    assert_eq!(asked.question.as_deref(), Some("Website Refresh or Mobile App?"));
    assert_eq!(h.session.state(), TurnState::AwaitingUser);
    assert_eq!(h.store.version(), 0);

    let done = h
        .session
        .continue_with_user_response("Mobile App")
        .await
        .unwrap();
    assert_eq!(done.status, MessageStatus::Completed);
    assert_eq!(h.session.state(), TurnState::Idle);
    assert_eq!(h.store.snapshot().portfolio.projects[1].status.as_str(), "on-hold");

    // The answer is sent with the question exchange replayed before it.
    let requests = h.model.requests();
    let second = &requests[1];
    let contents: Vec<_> = second.iter().skip(1).map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["flag the project", "Which project do you mean?", "Mobile App"]
    );
}

// ── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_and_undo_are_mirrored_to_persistence() {
    let raw = reply(json!([
        { "type": "comment", "projectId": "p1", "note": "shipped" },
        { "type": "update_task", "projectId": "p1", "taskId": "t1", "status": "in-progress" }
    ]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("ship it").await.unwrap();
    assert_eq!(
        h.recorder.calls(),
        vec!["add_activity p1 shipped", "update_task p1 t1 in-progress"]
    );

    assert!(h.session.undo_action(&message.id, 1).await.unwrap());
    assert_eq!(h.recorder.calls().last().unwrap(), "update_task p1 t1 todo");
}

#[tokio::test]
async fn undo_still_rolls_back_when_persistence_fails() {
    let raw = reply(json!([{ "type": "comment", "projectId": "p1", "note": "shipped" }]));
    let mut h = harness(&[raw.as_str()]);
    let message = h.session.send_message("ship it").await.unwrap();
    h.recorder.reject("delete_");

    assert!(h.session.undo_action(&message.id, 0).await.unwrap());
    assert_eq!(h.recorder.calls().last().unwrap(), "delete_activity p1");
    assert!(h.session.portfolio().projects[0].recent_activity.is_empty());
    assert!(!h.session.undo_action(&message.id, 0).await.unwrap());
}

// ── Concurrency ─────────────────────────────────────────────────────────────

/// Store that lets another writer commit right after each snapshot.
struct RacingStore {
    inner: InMemoryStore,
}

impl PortfolioStore for RacingStore {
    fn snapshot(&self) -> Snapshot {
        let snapshot = self.inner.snapshot();
        let _ = self.inner.commit(snapshot.clone());
        snapshot
    }

    fn commit(&self, snapshot: Snapshot) -> folio_engine::Result<u64> {
        self.inner.commit(snapshot)
    }

    fn version(&self) -> u64 {
        self.inner.version()
    }
}

#[tokio::test]
async fn stale_commit_is_rejected() {
    let raw = reply(json!([{ "type": "comment", "projectId": "p1", "note": "hi" }]));
    let model = Arc::new(ScriptedModel::new([raw]));
    let store = Arc::new(RacingStore {
        inner: InMemoryStore::new(portfolio()),
    });
    let recorder = Arc::new(Recorder::default());
    let mut session = ChatSession::new(model, store.clone(), recorder.clone(), SessionConfig::default());

    let err = session.send_message("hi").await.unwrap_err();
    assert_matches!(err, EngineError::StaleSnapshot { expected: 0, actual: 1 });
    assert!(store.inner.snapshot().portfolio.projects[0].recent_activity.is_empty());
    assert!(session.ledger().is_empty());
    assert!(recorder.calls().is_empty());
    assert_eq!(session.state(), TurnState::Idle);
}
