//! Conversation sessions and the stores that keep their turns.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifies a conversation: who is talking (`actor_id`) and which
/// conversation it is (`session_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub actor_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(actor_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            session_id: session_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_id, self.session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// A conversation and its ordered turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub actor_id: String,
    pub session_id: String,
    pub turns: Vec<Turn>,
}

impl AgentSession {
    pub fn new(key: &SessionKey) -> Self {
        Self {
            actor_id: key.actor_id.clone(),
            session_id: key.session_id.clone(),
            turns: Vec::new(),
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.actor_id.clone(), self.session_id.clone())
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

/// Storage for conversation turns, keyed by actor and session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session; an unknown key yields an empty session.
    async fn load(&self, key: &SessionKey) -> anyhow::Result<AgentSession>;

    /// Append one turn to the end of the session.
    async fn append(&self, key: &SessionKey, turn: Turn) -> anyhow::Result<()>;

    async fn delete(&self, key: &SessionKey) -> anyhow::Result<()>;

    /// Session ids known for an actor.
    async fn list_sessions(&self, actor_id: &str) -> anyhow::Result<Vec<String>>;
}

/// Process-local session store. Turns are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: std::sync::RwLock<HashMap<SessionKey, AgentSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &SessionKey) -> anyhow::Result<AgentSession> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on session store"))?;
        Ok(sessions
            .get(key)
            .cloned()
            .unwrap_or_else(|| AgentSession::new(key)))
    }

    async fn append(&self, key: &SessionKey, turn: Turn) -> anyhow::Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on session store"))?;
        sessions
            .entry(key.clone())
            .or_insert_with(|| AgentSession::new(key))
            .push(turn);
        tracing::debug!(session = %key, "Appended turn to in-memory session");
        Ok(())
    }

    async fn delete(&self, key: &SessionKey) -> anyhow::Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| anyhow::anyhow!("Failed to acquire write lock on session store"))?;
        sessions.remove(key);
        tracing::debug!(session = %key, "Deleted in-memory session");
        Ok(())
    }

    async fn list_sessions(&self, actor_id: &str) -> anyhow::Result<Vec<String>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Failed to acquire read lock on session store"))?;
        let mut ids: Vec<String> = sessions
            .keys()
            .filter(|k| k.actor_id == actor_id)
            .map(|k| k.session_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_loads_empty() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::new("alice", "s1");
        let session = store.load(&key).await.unwrap();
        assert_eq!(session.actor_id, "alice");
        assert_eq!(session.session_id, "s1");
        assert!(session.turns.is_empty());
    }

    #[tokio::test]
    async fn turns_are_kept_in_order() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::new("alice", "s1");

        store.append(&key, Turn::user("2+2")).await.unwrap();
        store.append(&key, Turn::assistant("4")).await.unwrap();

        let session = store.load(&key).await.unwrap();
        assert_eq!(session.turns, vec![Turn::user("2+2"), Turn::assistant("4")]);
    }

    #[tokio::test]
    async fn sessions_are_scoped_by_actor() {
        let store = InMemorySessionStore::new();
        store
            .append(&SessionKey::new("alice", "b"), Turn::user("hi"))
            .await
            .unwrap();
        store
            .append(&SessionKey::new("alice", "a"), Turn::user("hi"))
            .await
            .unwrap();
        store
            .append(&SessionKey::new("bob", "c"), Turn::user("hi"))
            .await
            .unwrap();

        assert_eq!(store.list_sessions("alice").await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.list_sessions("bob").await.unwrap(), vec!["c"]);
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = InMemorySessionStore::new();
        let key = SessionKey::new("alice", "s1");
        store.append(&key, Turn::user("hi")).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(store.load(&key).await.unwrap().turns.is_empty());
        assert!(store.list_sessions("alice").await.unwrap().is_empty());
    }
}
