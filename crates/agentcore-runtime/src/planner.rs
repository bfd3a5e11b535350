//! Decodes a model reply into the agent's next step.
//!
//! Models are asked to answer either with plain text, with
//! `{"response": "..."}`, or with `{"tool_calls": [{"name": ..., "args": {...}}]}`.
//! JSON may arrive wrapped in a Markdown code fence.

use agentcore_core::messaging::{AgentMessage, MessageContent};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlannedToolCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    CallTools(Vec<PlannedToolCall>),
    Respond(String),
}

#[derive(Debug, Deserialize)]
struct PlannerOutput {
    #[serde(default)]
    tool_calls: Vec<PlannedToolCall>,
    #[serde(default)]
    response: Option<String>,
}

impl PlannerOutput {
    fn into_decision(self) -> Option<PlannerDecision> {
        if !self.tool_calls.is_empty() {
            Some(PlannerDecision::CallTools(self.tool_calls))
        } else {
            self.response.map(PlannerDecision::Respond)
        }
    }
}

pub fn decide(message: &AgentMessage) -> anyhow::Result<PlannerDecision> {
    match &message.content {
        MessageContent::Json(value) => serde_json::from_value::<PlannerOutput>(value.clone())?
            .into_decision()
            .ok_or_else(|| anyhow::anyhow!("Model reply has neither tool_calls nor response")),
        MessageContent::Text(text) => Ok(parse_from_text(text)
            .and_then(PlannerOutput::into_decision)
            .unwrap_or_else(|| PlannerDecision::Respond(text.clone()))),
    }
}

/// Whether text starting like this may turn out to be a JSON envelope, in
/// which case a streaming caller must hold it back until it is complete.
pub fn may_be_envelope(text: &str) -> bool {
    matches!(text.trim_start().chars().next(), Some('{') | Some('`'))
}

fn parse_from_text(text: &str) -> Option<PlannerOutput> {
    if let Some(parsed) = decode(text) {
        return Some(parsed);
    }
    let trimmed = text.trim();
    if let Some(without_ticks) = trimmed.strip_prefix("```") {
        // optional language tag, e.g. ```json
        let without_lang = without_ticks
            .trim_start_matches(|c: char| c.is_alphabetic())
            .trim_start();
        let inner = match without_lang.rfind("```") {
            Some(end) => &without_lang[..end],
            None => without_lang,
        };
        return decode(inner);
    }
    None
}

fn decode(s: &str) -> Option<PlannerOutput> {
    serde_json::from_str::<Value>(s.trim())
        .ok()
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value::<PlannerOutput>(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_core::messaging::MessageRole;
    use serde_json::json;

    #[test]
    fn plain_text_is_a_response() {
        let decision = decide(&AgentMessage::agent("The answer is 4")).unwrap();
        assert_eq!(decision, PlannerDecision::Respond("The answer is 4".into()));
    }

    #[test]
    fn fenced_tool_call_is_decoded() {
        let text = "```json\n{\"tool_calls\": [{\"name\": \"add\", \"args\": {\"a\": 2, \"b\": 2}}]}\n```";
        match decide(&AgentMessage::agent(text)).unwrap() {
            PlannerDecision::CallTools(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "add");
                assert_eq!(calls[0].args, json!({"a": 2, "b": 2}));
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn response_envelope_is_unwrapped() {
        let decision = decide(&AgentMessage::agent("{\"response\": \"4\"}")).unwrap();
        assert_eq!(decision, PlannerDecision::Respond("4".into()));
    }

    #[test]
    fn unrelated_json_text_is_returned_verbatim() {
        let decision = decide(&AgentMessage::agent("{\"x\": 1}")).unwrap();
        assert_eq!(decision, PlannerDecision::Respond("{\"x\": 1}".into()));
    }

    #[test]
    fn json_content_without_fields_is_an_error() {
        let message = AgentMessage {
            role: MessageRole::Agent,
            content: MessageContent::Json(json!({"other": true})),
            metadata: None,
        };
        assert!(decide(&message).is_err());
    }

    #[test]
    fn envelope_detection_looks_at_first_visible_char() {
        assert!(may_be_envelope("  {\"tool"));
        assert!(may_be_envelope("```json"));
        assert!(!may_be_envelope("Hello"));
        assert!(!may_be_envelope("   "));
    }
}
