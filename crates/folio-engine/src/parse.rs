//! Reply parsing.
//!
//! The model may answer with plain prose, a fenced JSON block embedded in
//! prose, or a bare JSON object. Anything that does not yield a JSON object
//! is plain text with no actions; that is a valid answer, not an error.

use serde_json::Value;

/// A model reply split into its parts.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedReply {
    /// Text to show the user.
    pub display_text: String,
    /// The raw `actions` value, unvalidated. An empty array when absent.
    pub actions: Value,
    /// Clarifying question, when the model needs more input.
    pub question: Option<String>,
    /// Whether a JSON envelope was found.
    pub structured: bool,
}

impl ParsedReply {
    fn plain(raw: &str) -> Self {
        Self {
            display_text: raw.trim().to_string(),
            actions: Value::Array(Vec::new()),
            question: None,
            structured: false,
        }
    }
}

/// Parse one raw model reply.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let (candidate, outside) = match fenced_block(raw) {
        Some((body, outside)) => (body, Some(outside)),
        None => (raw.trim(), None),
    };

    let Ok(Value::Object(mut envelope)) = serde_json::from_str::<Value>(candidate) else {
        return ParsedReply::plain(raw);
    };

    let question = match envelope.remove("question") {
        Some(Value::String(q)) if !q.trim().is_empty() => Some(q.trim().to_string()),
        _ => None,
    };
    let response = match envelope.remove("response") {
        Some(Value::String(r)) if !r.trim().is_empty() => Some(r.trim().to_string()),
        _ => None,
    };
    let actions = envelope
        .remove("actions")
        .filter(|v| !v.is_null())
        .unwrap_or_else(|| Value::Array(Vec::new()));

    let display_text = response
        .or_else(|| outside.filter(|o| !o.is_empty()))
        .or_else(|| question.clone())
        .unwrap_or_else(|| raw.trim().to_string());

    ParsedReply {
        display_text,
        actions,
        question,
        structured: true,
    }
}

/// Body of the first fenced code block and the prose around it.
fn fenced_block(raw: &str) -> Option<(&str, String)> {
    let open = raw.find("```")?;
    let after_fence = &raw[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;

    let before = raw[..open].trim();
    let after = body[close + 3..].trim();
    let outside = match (before.is_empty(), after.is_empty()) {
        (false, false) => format!("{before}\n{after}"),
        (false, true) => before.to_string(),
        (true, false) => after.to_string(),
        (true, true) => String::new(),
    };
    Some((body[..close].trim(), outside))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
