use agentcore_core::llm::{ChunkStream, LanguageModel, LlmRequest, LlmResponse, StreamChunk};
use agentcore_core::messaging::AgentMessage;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::chat_turn;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: Option<String>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_url: None,
        }
    }

    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        self.api_url = api_url;
        self
    }

    fn url(&self) -> &str {
        self.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("api_url", &self.url())
            .finish()
    }
}

pub struct OpenAiChatModel {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .user_agent(concat!("agentcore-kit/", env!("CARGO_PKG_VERSION")))
                .build()?,
            config,
        })
    }

    async fn post(&self, request: &LlmRequest, stream: bool) -> anyhow::Result<reqwest::Response> {
        let messages = to_openai_messages(request);
        let body = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            stream: stream.then_some(true),
        };

        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            stream,
            "OpenAI request"
        );

        let response = self
            .client
            .post(self.config.url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, body = %error_text, "OpenAI API error");
            anyhow::bail!("OpenAI API error: {status} - {error_text}");
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [OpenAiMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

fn to_openai_messages(request: &LlmRequest) -> Vec<OpenAiMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if !request.system_prompt.is_empty() {
        messages.push(OpenAiMessage {
            role: "system",
            content: request.system_prompt.clone(),
        });
    }
    for msg in &request.messages {
        let (role, content) = chat_turn(msg);
        messages.push(OpenAiMessage { role, content });
    }
    messages
}

/// Content of one SSE line: `Some(None)` for `[DONE]`, `Some(Some(delta))`
/// for a content delta, `None` for anything else.
fn parse_sse_line(line: &str) -> Option<Option<String>> {
    let data = line.strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(None);
    }
    match serde_json::from_str::<StreamResponse>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
            .map(Some),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse streaming chunk");
            None
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        let data: ChatResponse = self.post(&request, false).await?.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("OpenAI response missing choices"))?;

        Ok(LlmResponse {
            message: AgentMessage::agent(choice.message.content.unwrap_or_default()),
        })
    }

    async fn generate_stream(&self, request: LlmRequest) -> anyhow::Result<ChunkStream> {
        let mut bytes = Box::pin(self.post(&request, true).await?.bytes_stream());

        let stream = async_stream::try_stream! {
            let mut pending: Vec<u8> = Vec::new();
            let mut accumulated = String::new();

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(|e| anyhow::anyhow!("Stream error: {e}"))?;
                pending.extend_from_slice(&chunk);

                // only complete lines; a payload may straddle two chunks
                while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=newline).collect();
                    match parse_sse_line(String::from_utf8_lossy(&line).trim_end()) {
                        Some(Some(delta)) => {
                            accumulated.push_str(&delta);
                            yield StreamChunk::TextDelta(delta);
                        }
                        Some(None) => break 'read,
                        None => {}
                    }
                }
            }

            yield StreamChunk::Done {
                message: AgentMessage::agent(accumulated),
            };
        };

        Ok(Box::pin(stream))
    }
}
