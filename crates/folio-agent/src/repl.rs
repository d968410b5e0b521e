//! Interactive terminal loop.
//!
//! Lines starting with `/` are commands; anything else goes to the model.
//! While the assistant is waiting on a clarifying question the next chat
//! line is sent as the answer.

use std::fmt::Write as _;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use folio_core::Portfolio;
use folio_engine::{AssistantMessage, ChatSession, EngineError, MessageStatus, TurnState};

const HELP: &str = "\
Commands:
  /projects              list projects and their tasks
  /undo <message> <n>    undo action n of a message
  /history               show the conversation
  /help                  show this help
  /quit                  exit
Anything else is sent to the assistant.";

/// A parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Print the portfolio.
    Projects,
    /// Undo one action.
    Undo {
        /// Message id as printed after a reply.
        message_id: String,
        /// Zero-based action index.
        action_index: usize,
    },
    /// Print the running conversation.
    History,
    /// Print the command list.
    Help,
    /// Leave the loop.
    Quit,
    /// Send text to the assistant.
    Chat(String),
    /// Blank line.
    Empty,
}

/// Parse one input line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    match parts.next().unwrap_or_default() {
        "projects" | "p" => Ok(Command::Projects),
        "history" | "h" => Ok(Command::History),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "undo" | "u" => {
            let (Some(message_id), Some(index), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err("usage: /undo <message> <action>".to_string());
            };
            let action_index = index
                .parse()
                .map_err(|_| format!("action index must be a number, got \"{index}\""))?;
            Ok(Command::Undo {
                message_id: message_id.to_string(),
                action_index,
            })
        }
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

/// Render an assistant reply with its action results.
pub fn render_message(message: &AssistantMessage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "assistant: {}", message.text);
    match message.status {
        MessageStatus::AwaitingUser => {
            if let Some(question) = &message.question {
                if *question != message.text {
                    let _ = writeln!(out, "  ? {question}");
                }
            }
        }
        MessageStatus::Failed => {
            let _ = writeln!(out, "  (nothing was changed)");
        }
        MessageStatus::Completed => {
            for (index, result) in message.results.iter().enumerate() {
                let marker = if result.deltas.is_empty() { "-" } else { "+" };
                let _ = writeln!(out, "  {marker} [{index}] {}", result.detail);
            }
            if message.results.iter().any(|r| !r.deltas.is_empty()) {
                let _ = writeln!(out, "  message {} (undo with /undo {} <n>)", message.id, message.id);
            }
        }
    }
    out
}

/// Render the portfolio as an indented outline.
pub fn render_portfolio(portfolio: &Portfolio) -> String {
    if portfolio.is_empty() {
        return "no projects\n".to_string();
    }
    let mut out = String::new();
    for project in &portfolio.projects {
        let _ = writeln!(
            out,
            "{} [{}] {}% ({}, {})",
            project.name, project.id, project.progress, project.status, project.priority
        );
        for task in &project.plan {
            let _ = writeln!(out, "  - {} [{}] {}", task.title, task.id, task.status);
            for subtask in &task.subtasks {
                let _ = writeln!(out, "      - {} [{}] {}", subtask.title, subtask.id, subtask.status);
            }
        }
    }
    out
}

/// Read stdin until EOF or `/quit`.
pub async fn run(session: &mut ChatSession) -> Result<()> {
    println!("folio: ask about or update your projects. /help for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Projects => print!("{}", render_portfolio(&session.portfolio())),
            Command::History => {
                for message in session.history() {
                    println!("{}: {}", message.role, message.content);
                }
            }
            Command::Undo {
                message_id,
                action_index,
            } => match session.undo_action(&message_id, action_index).await {
                Ok(true) => println!("undone"),
                Ok(false) => println!("nothing to undo"),
                Err(EngineError::UnknownMessage(id)) => println!("no message {id}"),
                Err(e) => return Err(e.into()),
            },
            Command::Chat(text) => {
                let reply = if session.state() == TurnState::AwaitingUser {
                    session.continue_with_user_response(&text).await
                } else {
                    session.send_message(&text).await
                };
                match reply {
                    Ok(message) => print!("{}", render_message(&message)),
                    Err(e) => {
                        warn!(error = %e, "turn failed");
                        println!("assistant: that didn't go through ({e}); nothing was changed");
                    }
                }
            }
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
