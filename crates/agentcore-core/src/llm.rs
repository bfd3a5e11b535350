use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use crate::messaging::AgentMessage;
use crate::tools::ToolSchema;

/// Minimal request structure passed to a language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub messages: Vec<AgentMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
}

impl LlmRequest {
    pub fn new(system_prompt: impl Into<String>, messages: Vec<AgentMessage>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: AgentMessage,
}

/// Incremental output of a streaming model call.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta(String),
    Done { message: AgentMessage },
    Error(String),
}

pub type ChunkStream = Pin<Box<dyn Stream<Item = anyhow::Result<StreamChunk>> + Send>>;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse>;

    /// Streaming variant. Models without a native streaming API yield the whole
    /// reply as a single delta followed by `Done`.
    async fn generate_stream(&self, request: LlmRequest) -> anyhow::Result<ChunkStream> {
        let response = self.generate(request).await?;
        let text = response.message.text_content();
        let chunks = vec![
            Ok(StreamChunk::TextDelta(text)),
            Ok(StreamChunk::Done {
                message: response.message,
            }),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct FixedModel;

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn generate(&self, _request: LlmRequest) -> anyhow::Result<LlmResponse> {
            Ok(LlmResponse {
                message: AgentMessage::agent("fixed"),
            })
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_generate() {
        let mut stream = FixedModel
            .generate_stream(LlmRequest::new("sys", vec![]))
            .await
            .unwrap();

        match stream.next().await {
            Some(Ok(StreamChunk::TextDelta(text))) => assert_eq!(text, "fixed"),
            other => panic!("expected delta, got {other:?}"),
        }
        match stream.next().await {
            Some(Ok(StreamChunk::Done { message })) => {
                assert_eq!(message.content.as_text(), Some("fixed"))
            }
            other => panic!("expected done, got {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }
}
