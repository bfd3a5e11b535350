use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::events::{AgentEvent, EventStream};
use crate::messaging::AgentMessage;
use crate::session::SessionKey;

/// Minimal metadata about an agent instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

/// A fully configured agent (model + tools + system prompt) that answers
/// text prompts within a conversation.
#[async_trait]
pub trait AgentHandle: Send + Sync {
    async fn describe(&self) -> AgentDescriptor;

    /// Run the prompt to completion and return the final reply.
    async fn invoke(&self, session: &SessionKey, prompt: &str) -> anyhow::Result<AgentMessage>;

    /// Run the prompt and yield events as they become available. The stream is
    /// finite and ends with [`AgentEvent::Done`].
    async fn stream(&self, session: &SessionKey, prompt: &str) -> anyhow::Result<EventStream> {
        let reply = self.invoke(session, prompt).await?;
        let event = AgentEvent::done(reply.text_content());
        Ok(Box::pin(futures::stream::iter(vec![Ok(event)])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct Echo;

    #[async_trait]
    impl AgentHandle for Echo {
        async fn describe(&self) -> AgentDescriptor {
            AgentDescriptor {
                name: "echo".into(),
                version: "0".into(),
                description: None,
            }
        }

        async fn invoke(&self, _session: &SessionKey, prompt: &str) -> anyhow::Result<AgentMessage> {
            Ok(AgentMessage::agent(prompt))
        }
    }

    #[tokio::test]
    async fn default_stream_yields_single_done_event() {
        let events: Vec<AgentEvent> = Echo
            .stream(&SessionKey::new("a", "s"), "hello")
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect()
            .await;
        assert_eq!(events, vec![AgentEvent::done("hello")]);
    }
}
