//! Session store backed by the AgentCore memory data plane.
//!
//! Each conversational turn becomes one event in the memory resource, keyed by
//! actor id and session id. Loading a session lists its events and replays them
//! in timestamp order.

use agentcore_core::session::{AgentSession, SessionKey, SessionStore, Turn, TurnRole};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::SignedClient;
use crate::sigv4::{percent_encode_segment, HttpMethod};

pub const SERVICE: &str = "bedrock-agentcore";
const PAGE_SIZE: u32 = 100;

pub fn data_plane_endpoint(region: &str) -> String {
    format!("https://bedrock-agentcore.{region}.amazonaws.com")
}

#[derive(Debug, Serialize, Deserialize)]
struct ConversationalPayload {
    conversational: Conversational,
}

#[derive(Debug, Serialize, Deserialize)]
struct Conversational {
    content: TextContent,
    role: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TextContent {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest<'a> {
    actor_id: &'a str,
    session_id: &'a str,
    event_timestamp: f64,
    payload: Vec<ConversationalPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageRequest<'a> {
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_payloads: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryEvent {
    event_id: String,
    #[serde(default)]
    event_timestamp: Value,
    #[serde(default)]
    payload: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEventsResponse {
    #[serde(default)]
    events: Vec<MemoryEvent>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSummary {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSessionsResponse {
    #[serde(default)]
    session_summaries: Vec<SessionSummary>,
    #[serde(default)]
    next_token: Option<String>,
}

/// [`SessionStore`] that persists turns as AgentCore memory events.
#[derive(Debug, Clone)]
pub struct AgentCoreMemoryStore {
    client: SignedClient,
    memory_id: String,
    endpoint: String,
}

impl AgentCoreMemoryStore {
    pub fn new(client: SignedClient, memory_id: impl Into<String>) -> Self {
        let endpoint = data_plane_endpoint(client.region());
        Self {
            client,
            memory_id: memory_id.into(),
            endpoint,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn memory_id(&self) -> &str {
        &self.memory_id
    }

    fn memory_url(&self) -> String {
        format!(
            "{}/memories/{}",
            self.endpoint,
            percent_encode_segment(&self.memory_id)
        )
    }

    fn session_url(&self, key: &SessionKey) -> String {
        format!(
            "{}/actor/{}/sessions/{}",
            self.memory_url(),
            percent_encode_segment(&key.actor_id),
            percent_encode_segment(&key.session_id)
        )
    }

    async fn list_events(&self, key: &SessionKey) -> anyhow::Result<Vec<MemoryEvent>> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page: ListEventsResponse = self
                .client
                .send_json(
                    HttpMethod::Post,
                    &self.session_url(key),
                    Some(&PageRequest {
                        max_results: PAGE_SIZE,
                        include_payloads: Some(true),
                        next_token: next_token.as_deref(),
                    }),
                    &[],
                )
                .await
                .with_context(|| format!("Failed to list memory events for {key}"))?;

            events.extend(page.events);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        events.sort_by(|a, b| {
            timestamp_seconds(&a.event_timestamp).total_cmp(&timestamp_seconds(&b.event_timestamp))
        });
        Ok(events)
    }
}

#[async_trait]
impl SessionStore for AgentCoreMemoryStore {
    async fn load(&self, key: &SessionKey) -> anyhow::Result<AgentSession> {
        let events = self.list_events(key).await?;
        let mut session = AgentSession::new(key);
        for event in &events {
            for payload in &event.payload {
                if let Some(turn) = turn_from_payload(payload) {
                    session.push(turn);
                }
            }
        }

        tracing::debug!(
            session = %key,
            memory_id = %self.memory_id,
            turns = session.turns.len(),
            "Loaded session from memory"
        );
        Ok(session)
    }

    async fn append(&self, key: &SessionKey, turn: Turn) -> anyhow::Result<()> {
        let role = match turn.role {
            TurnRole::User => "USER",
            TurnRole::Assistant => "ASSISTANT",
        };
        let request = CreateEventRequest {
            actor_id: &key.actor_id,
            session_id: &key.session_id,
            event_timestamp: epoch_seconds(self.client.now()),
            payload: vec![ConversationalPayload {
                conversational: Conversational {
                    content: TextContent { text: turn.text },
                    role: role.to_string(),
                },
            }],
        };

        let _: Value = self
            .client
            .send_json(
                HttpMethod::Post,
                &format!("{}/events", self.memory_url()),
                Some(&request),
                &[],
            )
            .await
            .with_context(|| format!("Failed to store memory event for {key}"))?;

        tracing::debug!(session = %key, role, "Stored turn in memory");
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> anyhow::Result<()> {
        let events = self.list_events(key).await?;
        for event in &events {
            let _: Value = self
                .client
                .send_json::<(), _>(
                    HttpMethod::Delete,
                    &format!(
                        "{}/events/{}",
                        self.session_url(key),
                        percent_encode_segment(&event.event_id)
                    ),
                    None,
                    &[],
                )
                .await
                .with_context(|| format!("Failed to delete memory event {}", event.event_id))?;
        }

        tracing::debug!(session = %key, events = events.len(), "Deleted session from memory");
        Ok(())
    }

    async fn list_sessions(&self, actor_id: &str) -> anyhow::Result<Vec<String>> {
        let mut sessions = Vec::new();
        let mut next_token: Option<String> = None;
        let url = format!(
            "{}/actor/{}/sessions",
            self.memory_url(),
            percent_encode_segment(actor_id)
        );

        loop {
            let page: ListSessionsResponse = self
                .client
                .send_json(
                    HttpMethod::Post,
                    &url,
                    Some(&PageRequest {
                        max_results: PAGE_SIZE,
                        include_payloads: None,
                        next_token: next_token.as_deref(),
                    }),
                    &[],
                )
                .await
                .with_context(|| format!("Failed to list memory sessions for {actor_id}"))?;

            sessions.extend(page.session_summaries.into_iter().map(|s| s.session_id));
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(sessions)
    }
}

fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64 / 1000.0
}

/// Event timestamps arrive as epoch seconds or RFC 3339 strings.
fn timestamp_seconds(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| epoch_seconds(t.with_timezone(&Utc)))
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn turn_from_payload(payload: &Value) -> Option<Turn> {
    let conversational = payload.get("conversational")?;
    let text = conversational.get("content")?.get("text")?.as_str()?;
    match conversational.get("role")?.as_str()? {
        "USER" => Some(Turn::user(text)),
        "ASSISTANT" => Some(Turn::assistant(text)),
        other => {
            tracing::trace!(role = other, "Skipping memory event with unsupported role");
            None
        }
    }
}
