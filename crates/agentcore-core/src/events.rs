//! Events produced by a streaming agent invocation.

use std::pin::Pin;

use futures::stream::Stream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AgentEvent {
    TextDelta(TextDeltaEvent),
    ToolStarted(ToolStartedEvent),
    ToolCompleted(ToolCompletedEvent),
    Done(DoneEvent),
}

impl AgentEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        AgentEvent::TextDelta(TextDeltaEvent { text: text.into() })
    }

    pub fn done(text: impl Into<String>) -> Self {
        AgentEvent::Done(DoneEvent { text: text.into() })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextDeltaEvent {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolStartedEvent {
    pub tool_name: String,
    pub input_summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCompletedEvent {
    pub tool_name: String,
    pub duration_ms: u64,
    pub result_summary: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoneEvent {
    pub text: String,
}

/// Lazy, finite sequence of agent events.
pub type EventStream = Pin<Box<dyn Stream<Item = anyhow::Result<AgentEvent>> + Send>>;

/// Truncate a value for log lines and event summaries.
pub fn summarize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let value = serde_json::to_value(AgentEvent::text_delta("he")).unwrap();
        assert_eq!(value, serde_json::json!({"event_type": "text_delta", "text": "he"}));

        let done: AgentEvent =
            serde_json::from_value(serde_json::json!({"event_type": "done", "text": "4"})).unwrap();
        assert_eq!(done, AgentEvent::done("4"));
        assert!(done.is_terminal());
    }

    #[test]
    fn summarize_truncates_on_char_boundary() {
        assert_eq!(summarize("short", 10), "short");
        assert_eq!(summarize("héllo wörld", 5), "héllo...");
    }
}
