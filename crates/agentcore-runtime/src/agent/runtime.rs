//! Invocation loop of the conversational agent.
//!
//! One invocation loads the session, appends the user turn, then alternates
//! model calls and tool executions until the model answers in text or the
//! iteration budget is spent. The answer is stored as the assistant turn.

use std::sync::Arc;
use std::time::Instant;

use agentcore_core::agent::{AgentDescriptor, AgentHandle};
use agentcore_core::events::{
    summarize, AgentEvent, EventStream, ToolCompletedEvent, ToolStartedEvent,
};
use agentcore_core::llm::{LanguageModel, LlmRequest, StreamChunk};
use agentcore_core::messaging::{AgentMessage, MessageRole};
use agentcore_core::session::{SessionKey, SessionStore, Turn, TurnRole};
use agentcore_core::tools::{ToolContext, ToolRegistry, ToolResult};
use async_trait::async_trait;
use futures::StreamExt;

use crate::planner::{self, PlannedToolCall, PlannerDecision};

const SUMMARY_CHARS: usize = 200;

#[derive(Clone)]
pub struct ConversationalAgent {
    descriptor: AgentDescriptor,
    system_prompt: String,
    model: Arc<dyn LanguageModel>,
    tools: ToolRegistry,
    sessions: Arc<dyn SessionStore>,
    max_iterations: usize,
}

/// Outcome of one tool call, ready to be fed back to the model.
struct ToolOutcome {
    message: AgentMessage,
    success: bool,
    duration_ms: u64,
}

impl ConversationalAgent {
    pub(crate) fn new(
        descriptor: AgentDescriptor,
        system_prompt: String,
        model: Arc<dyn LanguageModel>,
        tools: ToolRegistry,
        sessions: Arc<dyn SessionStore>,
        max_iterations: usize,
    ) -> Self {
        Self {
            descriptor,
            system_prompt,
            model,
            tools,
            sessions,
            max_iterations,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// History for the model: stored turns followed by the new prompt. The
    /// user turn is persisted before the model is called.
    async fn begin(&self, key: &SessionKey, prompt: &str) -> anyhow::Result<Vec<AgentMessage>> {
        let session = self.sessions.load(key).await?;
        let mut messages: Vec<AgentMessage> = session
            .turns
            .iter()
            .map(|turn| match turn.role {
                TurnRole::User => AgentMessage::user(turn.text.clone()),
                TurnRole::Assistant => AgentMessage::agent(turn.text.clone()),
            })
            .collect();
        messages.push(AgentMessage::user(prompt));
        self.sessions.append(key, Turn::user(prompt)).await?;

        tracing::debug!(session = %key, prior_turns = session.turns.len(), "Starting invocation");
        Ok(messages)
    }

    async fn finish(&self, key: &SessionKey, text: &str) -> anyhow::Result<()> {
        self.sessions.append(key, Turn::assistant(text)).await
    }

    fn request(&self, messages: &[AgentMessage]) -> LlmRequest {
        LlmRequest::new(self.system_prompt.clone(), messages.to_vec()).with_tools(self.tools.schemas())
    }

    /// Unknown tools and tool failures are reported back to the model rather
    /// than aborting the invocation.
    async fn run_tool(&self, key: &SessionKey, call: &PlannedToolCall) -> ToolOutcome {
        let started = Instant::now();
        let ctx = ToolContext::new(key.clone());
        let (result, success) = match self.tools.get(&call.name) {
            None => {
                tracing::warn!(tool = %call.name, "Model requested unknown tool");
                (
                    ToolResult::text(format!(
                        "Error: unknown tool `{}`. Available tools: {}",
                        call.name,
                        self.tools.names().join(", ")
                    )),
                    false,
                )
            }
            Some(tool) => match tool.execute(call.args.clone(), ctx.clone()).await {
                Ok(result) => (result, true),
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "Tool execution failed");
                    (
                        ToolResult::text(format!("Error: {e}")),
                        false,
                    )
                }
            },
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(tool = %call.name, success, duration_ms, "Tool executed");

        ToolOutcome {
            message: result.into_message(&call.name, &ctx),
            success,
            duration_ms,
        }
    }

    fn exhausted(&self) -> anyhow::Error {
        anyhow::anyhow!(
            "Agent stopped after {} model calls without a final response",
            self.max_iterations
        )
    }
}

#[async_trait]
impl AgentHandle for ConversationalAgent {
    async fn describe(&self) -> AgentDescriptor {
        self.descriptor.clone()
    }

    async fn invoke(&self, key: &SessionKey, prompt: &str) -> anyhow::Result<AgentMessage> {
        let mut messages = self.begin(key, prompt).await?;

        for iteration in 0..self.max_iterations {
            let response = self.model.generate(self.request(&messages)).await?;
            match planner::decide(&response.message)? {
                PlannerDecision::Respond(text) => {
                    tracing::debug!(session = %key, iteration, "Agent responded");
                    self.finish(key, &text).await?;
                    return Ok(AgentMessage::agent(text));
                }
                PlannerDecision::CallTools(calls) => {
                    messages.push(AgentMessage {
                        role: MessageRole::Agent,
                        ..response.message
                    });
                    for call in &calls {
                        messages.push(self.run_tool(key, call).await.message);
                    }
                }
            }
        }

        Err(self.exhausted())
    }

    async fn stream(&self, key: &SessionKey, prompt: &str) -> anyhow::Result<EventStream> {
        let mut messages = self.begin(key, prompt).await?;
        let agent = self.clone();
        let key = key.clone();

        let stream = async_stream::try_stream! {
            let mut answer: Option<String> = None;

            for _ in 0..agent.max_iterations {
                let mut chunks = agent.model.generate_stream(agent.request(&messages)).await?;
                let mut text = String::new();
                // None until the first visible character decides the mode
                let mut forwarding: Option<bool> = None;

                while let Some(chunk) = chunks.next().await {
                    match chunk? {
                        StreamChunk::TextDelta(delta) => {
                            if delta.is_empty() {
                                continue;
                            }
                            text.push_str(&delta);
                            match forwarding {
                                Some(true) => yield AgentEvent::text_delta(delta),
                                Some(false) => {}
                                None if text.trim().is_empty() => {}
                                None => {
                                    let forward = !planner::may_be_envelope(&text);
                                    forwarding = Some(forward);
                                    if forward {
                                        yield AgentEvent::text_delta(text.clone());
                                    }
                                }
                            }
                        }
                        StreamChunk::Done { message } => {
                            let final_text = message.text_content();
                            if text.is_empty() && !final_text.is_empty() {
                                text = final_text;
                            }
                            break;
                        }
                        StreamChunk::Error(e) => Err(anyhow::anyhow!("Model stream error: {e}"))?,
                    }
                }

                if forwarding == Some(true) {
                    answer = Some(text);
                    break;
                }

                let reply = AgentMessage::agent(text);
                match planner::decide(&reply)? {
                    PlannerDecision::Respond(response) => {
                        if !response.is_empty() {
                            yield AgentEvent::text_delta(response.clone());
                        }
                        answer = Some(response);
                        break;
                    }
                    PlannerDecision::CallTools(calls) => {
                        messages.push(reply);
                        for call in &calls {
                            yield AgentEvent::ToolStarted(ToolStartedEvent {
                                tool_name: call.name.clone(),
                                input_summary: summarize(&call.args.to_string(), SUMMARY_CHARS),
                            });
                            let outcome = agent.run_tool(&key, call).await;
                            yield AgentEvent::ToolCompleted(ToolCompletedEvent {
                                tool_name: call.name.clone(),
                                duration_ms: outcome.duration_ms,
                                result_summary: summarize(&outcome.message.text_content(), SUMMARY_CHARS),
                                success: outcome.success,
                            });
                            messages.push(outcome.message);
                        }
                    }
                }
            }

            let answer = answer.ok_or_else(|| agent.exhausted())?;
            agent.finish(&key, &answer).await?;
            yield AgentEvent::done(answer);
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBuilder;
    use crate::function_tool::create_tool;
    use agentcore_core::llm::{ChunkStream, LlmResponse};
    use agentcore_core::session::InMemorySessionStore;
    use std::collections::VecDeque;
    use std::num::NonZeroUsize;
    use std::sync::Mutex;

    /// Replies with scripted texts in order; streaming splits each reply into
    /// single-character deltas.
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn next(&self, request: LlmRequest) -> String {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("model called more often than scripted")
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
            Ok(LlmResponse {
                message: AgentMessage::agent(self.next(request)),
            })
        }

        async fn generate_stream(&self, request: LlmRequest) -> anyhow::Result<ChunkStream> {
            let reply = self.next(request);
            let mut chunks: Vec<anyhow::Result<StreamChunk>> = reply
                .chars()
                .map(|c| Ok(StreamChunk::TextDelta(c.to_string())))
                .collect();
            chunks.push(Ok(StreamChunk::Done {
                message: AgentMessage::agent(reply),
            }));
            Ok(Box::pin(futures::stream::iter(chunks)))
        }
    }

    fn add_tool() -> agentcore_core::tools::ToolBox {
        create_tool("add", "Add a and b", |args, _ctx| async move {
            let sum = args["a"].as_i64().unwrap_or(0) + args["b"].as_i64().unwrap_or(0);
            Ok(ToolResult::text(sum.to_string()))
        })
    }

    fn key() -> SessionKey {
        SessionKey::new("user-1", "session-1")
    }

    #[tokio::test]
    async fn plain_reply_is_returned_and_stored() {
        let model = ScriptedModel::new(&["4"]);
        let store = Arc::new(InMemorySessionStore::new());
        let agent = AgentBuilder::new("You are a calculator.")
            .with_model(model.clone())
            .with_session_store(store.clone())
            .build()
            .unwrap();

        let reply = agent.invoke(&key(), "2+2").await.unwrap();
        assert_eq!(reply.text_content(), "4");

        let session = store.load(&key()).await.unwrap();
        assert_eq!(session.turns, vec![Turn::user("2+2"), Turn::assistant("4")]);
    }

    #[tokio::test]
    async fn previous_turns_are_sent_to_the_model() {
        let model = ScriptedModel::new(&["first", "second"]);
        let agent = AgentBuilder::new("sys").with_model(model.clone()).build().unwrap();

        agent.invoke(&key(), "one").await.unwrap();
        agent.invoke(&key(), "two").await.unwrap();

        let requests = model.requests.lock().unwrap();
        let texts: Vec<_> = requests[1].messages.iter().map(|m| m.text_content()).collect();
        assert_eq!(texts, vec!["one", "first", "two"]);
    }

    #[tokio::test]
    async fn tool_call_round_trip() {
        let model = ScriptedModel::new(&[
            "```json\n{\"tool_calls\":[{\"name\":\"add\",\"args\":{\"a\":2,\"b\":2}}]}\n```",
            "2+2 is 4",
        ]);
        let agent = AgentBuilder::new("sys")
            .with_model(model.clone())
            .with_tool(add_tool())
            .build()
            .unwrap();

        let reply = agent.invoke(&key(), "what is 2+2?").await.unwrap();
        assert_eq!(reply.text_content(), "2+2 is 4");

        let requests = model.requests.lock().unwrap();
        assert!(requests[0].system_prompt.contains("`add`"));
        let tool_message = requests[1].messages.last().unwrap();
        assert_eq!(tool_message.role, MessageRole::Tool);
        assert_eq!(tool_message.text_content(), "4");
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_the_model() {
        let model = ScriptedModel::new(&[
            "{\"tool_calls\":[{\"name\":\"missing\",\"args\":{}}]}",
            "sorry",
        ]);
        let agent = AgentBuilder::new("sys").with_model(model.clone()).build().unwrap();

        assert_eq!(agent.invoke(&key(), "x").await.unwrap().text_content(), "sorry");
        let requests = model.requests.lock().unwrap();
        assert!(requests[1]
            .messages
            .last()
            .unwrap()
            .text_content()
            .contains("unknown tool `missing`"));
    }

    #[tokio::test]
    async fn iteration_budget_is_enforced() {
        let call = "{\"tool_calls\":[{\"name\":\"add\",\"args\":{}}]}";
        let model = ScriptedModel::new(&[call, call]);
        let agent = AgentBuilder::new("sys")
            .with_model(model)
            .with_tool(add_tool())
            .with_max_iterations(NonZeroUsize::new(2).unwrap())
            .build()
            .unwrap();

        let err = agent.invoke(&key(), "loop").await.unwrap_err();
        assert!(err.to_string().contains("2 model calls"));
    }

    #[tokio::test]
    async fn missing_model_fails_to_build() {
        assert!(AgentBuilder::new("sys").build().is_err());
    }

    async fn collect(agent: &ConversationalAgent, prompt: &str) -> Vec<AgentEvent> {
        agent
            .stream(&key(), prompt)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn plain_text_streams_as_it_arrives() {
        let model = ScriptedModel::new(&["Hi!"]);
        let store = Arc::new(InMemorySessionStore::new());
        let agent = AgentBuilder::new("sys")
            .with_model(model)
            .with_session_store(store.clone())
            .build()
            .unwrap();

        let events = collect(&agent, "hello").await;
        assert_eq!(
            events,
            vec![
                AgentEvent::text_delta("H"),
                AgentEvent::text_delta("i"),
                AgentEvent::text_delta("!"),
                AgentEvent::done("Hi!"),
            ]
        );
        let session = store.load(&key()).await.unwrap();
        assert_eq!(session.turns.last(), Some(&Turn::assistant("Hi!")));
    }

    #[tokio::test]
    async fn tool_envelope_is_never_streamed_as_text() {
        let model = ScriptedModel::new(&[
            "{\"tool_calls\":[{\"name\":\"add\",\"args\":{\"a\":1,\"b\":2}}]}",
            "{\"response\":\"3\"}",
        ]);
        let agent = AgentBuilder::new("sys")
            .with_model(model)
            .with_tool(add_tool())
            .build()
            .unwrap();

        let events = collect(&agent, "1+2").await;
        assert_eq!(events.len(), 4);
        match &events[0] {
            AgentEvent::ToolStarted(started) => {
                assert_eq!(started.tool_name, "add");
                assert_eq!(started.input_summary, "{\"a\":1,\"b\":2}");
            }
            other => panic!("expected tool_started, got {other:?}"),
        }
        match &events[1] {
            AgentEvent::ToolCompleted(done) => {
                assert!(done.success);
                assert_eq!(done.result_summary, "3");
            }
            other => panic!("expected tool_completed, got {other:?}"),
        }
        assert_eq!(events[2], AgentEvent::text_delta("3"));
        assert_eq!(events[3], AgentEvent::done("3"));
    }
}
