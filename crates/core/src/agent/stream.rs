//! Worker stdout stream protocol.
//!
//! Workers emit newline-delimited JSON. Three shapes matter: the session
//! announcement (`session_id`), assistant text content, and a call to the
//! signal-back tool carrying the worker's final status. Everything else,
//! including lines that fail to parse, is ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::work_unit::WorkRole;

/// Tool name workers call to report their outcome
pub const SIGNAL_TOOL_NAME: &str = "mcp__questforge__signal-back";

/// Outcome signal reported by a worker via the signal-back tool.
///
/// The last well-formed signal on the stream wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum StreamSignal {
    /// Work finished successfully
    Complete {
        step_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    /// Work partly done; the worker can be resumed from the continuation point
    PartiallyComplete {
        step_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        continuation_point: Option<String>,
    },
    /// The worker is blocked and wants another role dispatched first
    NeedsRoleFollowup {
        step_id: String,
        target_role: WorkRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
        /// Whether the signaling worker should be resumed afterwards
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume: Option<bool>,
    },
}

impl StreamSignal {
    /// Step id the signal refers to
    pub fn step_id(&self) -> &str {
        match self {
            StreamSignal::Complete { step_id, .. }
            | StreamSignal::PartiallyComplete { step_id, .. }
            | StreamSignal::NeedsRoleFollowup { step_id, .. } => step_id,
        }
    }
}

/// One protocol-relevant occurrence extracted from a stream line
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Session id announced by the worker CLI
    SessionStarted(String),
    /// Narrative assistant text
    Text(String),
    /// Signal-back tool call
    Signal(StreamSignal),
}

/// Extract protocol events from one stream line.
///
/// A single assistant line can carry several content items, so this returns
/// all events found in order. Malformed JSON yields no events.
pub fn parse_line(line: &str) -> Vec<StreamEvent> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let mut events = Vec::new();

    if let Some(id) = value.get("session_id").and_then(Value::as_str) {
        events.push(StreamEvent::SessionStarted(id.to_string()));
    }

    if value.get("type").and_then(Value::as_str) == Some("assistant") {
        let content = value
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_array);
        for item in content.into_iter().flatten() {
            match item.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        events.push(StreamEvent::Text(text.to_string()));
                    }
                }
                Some("tool_use") => {
                    if item.get("name").and_then(Value::as_str) != Some(SIGNAL_TOOL_NAME) {
                        continue;
                    }
                    if let Some(input) = item.get("input") {
                        if let Ok(signal) = serde_json::from_value::<StreamSignal>(input.clone()) {
                            events.push(StreamEvent::Signal(signal));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    events
}
