//! Bedrock `Converse` API, signed with SigV4 through [`SignedClient`].

use agentcore_aws::sigv4::percent_encode_segment;
use agentcore_aws::{HttpMethod, SignedClient};
use agentcore_core::llm::{LanguageModel, LlmRequest, LlmResponse};
use agentcore_core::messaging::AgentMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chat_turn;

pub const SERVICE: &str = "bedrock";

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub model_id: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl BedrockConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

pub struct BedrockConverseModel {
    client: SignedClient,
    config: BedrockConfig,
    endpoint: String,
}

impl BedrockConverseModel {
    /// `client` must sign for the `bedrock` service.
    pub fn new(client: SignedClient, config: BedrockConfig) -> Self {
        let endpoint = format!("https://bedrock-runtime.{}.amazonaws.com", client.region());
        Self {
            client,
            config,
            endpoint,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<ContentBlock>,
    messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inference_config: Option<InferenceConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConverseMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConverseOutput {
    message: ConverseMessage,
}

/// Converse wants strictly alternating user/assistant turns starting with a
/// user turn; consecutive turns of one role are merged.
fn to_converse_messages(request: &LlmRequest) -> (Vec<ContentBlock>, Vec<ConverseMessage>) {
    let mut system = Vec::new();
    if !request.system_prompt.is_empty() {
        system.push(ContentBlock {
            text: Some(request.system_prompt.clone()),
        });
    }

    let mut messages: Vec<ConverseMessage> = Vec::new();
    for msg in &request.messages {
        let (role, text) = chat_turn(msg);
        if role == "system" {
            system.push(ContentBlock { text: Some(text) });
            continue;
        }
        if messages.is_empty() && role == "assistant" {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.push(ContentBlock { text: Some(text) }),
            _ => messages.push(ConverseMessage {
                role: role.to_string(),
                content: vec![ContentBlock { text: Some(text) }],
            }),
        }
    }
    (system, messages)
}

#[async_trait]
impl LanguageModel for BedrockConverseModel {
    async fn generate(&self, request: LlmRequest) -> anyhow::Result<LlmResponse> {
        let (system, messages) = to_converse_messages(&request);
        let inference_config = (self.config.max_tokens.is_some() || self.config.temperature.is_some())
            .then(|| InferenceConfig {
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            });
        let body = ConverseRequest {
            system,
            messages,
            inference_config,
        };
        let url = format!(
            "{}/model/{}/converse",
            self.endpoint,
            percent_encode_segment(&self.config.model_id)
        );

        tracing::debug!(model_id = %self.config.model_id, messages = body.messages.len(), "Bedrock converse request");
        let response: ConverseResponse = self
            .client
            .send_json(HttpMethod::Post, &url, Some(&body), &[])
            .await?;
        tracing::debug!(stop_reason = ?response.stop_reason, "Bedrock converse response");

        let text = response
            .output
            .message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(LlmResponse {
            message: AgentMessage::agent(text),
        })
    }
}
