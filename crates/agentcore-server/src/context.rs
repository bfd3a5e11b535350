use std::sync::Arc;

use agentcore_aws::runtime_client::{SESSION_ID_HEADER, USER_ID_HEADER};
use agentcore_core::agent::AgentHandle;
use agentcore_core::session::SessionKey;
use axum::http::{header, HeaderMap};

pub const DEFAULT_ACTOR_ID: &str = "default_user";

/// Shape of the `/invocations` reply when the caller does not ask for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EntrypointMode {
    /// One JSON object once the agent has finished.
    #[default]
    Sync,
    /// Server-sent events, one per agent event.
    Stream,
}

/// Everything a handler needs, built once at startup and shared through axum
/// state.
#[derive(Clone)]
pub struct AppContext {
    agent: Arc<dyn AgentHandle>,
    default_actor_id: String,
    default_session_id: String,
    mode: EntrypointMode,
}

impl AppContext {
    /// Defaults: actor `default_user`, a fresh session id for the process
    /// lifetime, synchronous replies.
    pub fn new(agent: Arc<dyn AgentHandle>) -> Self {
        Self {
            agent,
            default_actor_id: DEFAULT_ACTOR_ID.to_string(),
            default_session_id: uuid::Uuid::new_v4().to_string(),
            mode: EntrypointMode::Sync,
        }
    }

    pub fn with_default_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.default_actor_id = actor_id.into();
        self
    }

    pub fn with_default_session(mut self, session_id: impl Into<String>) -> Self {
        self.default_session_id = session_id.into();
        self
    }

    pub fn with_mode(mut self, mode: EntrypointMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn agent(&self) -> &Arc<dyn AgentHandle> {
        &self.agent
    }

    pub fn mode(&self) -> EntrypointMode {
        self.mode
    }

    /// Conversation the request belongs to: runtime headers first, process
    /// defaults otherwise.
    pub fn session_key(&self, headers: &HeaderMap) -> SessionKey {
        let actor_id = header_value(headers, USER_ID_HEADER).unwrap_or(self.default_actor_id.as_str());
        let session_id =
            header_value(headers, SESSION_ID_HEADER).unwrap_or(self.default_session_id.as_str());
        SessionKey::new(actor_id, session_id)
    }

    /// `Accept: text/event-stream` forces streaming regardless of the
    /// configured mode.
    pub fn wants_stream(&self, headers: &HeaderMap) -> bool {
        let accepts_sse = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/event-stream"));
        accepts_sse || self.mode == EntrypointMode::Stream
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
