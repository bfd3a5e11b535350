//! Agent wiring from environment variables (optionally loaded from `.env`).

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use agentcore_aws::{
    require_env, AgentCoreMemoryStore, AwsError, AwsResult, EnvironmentCredentialsProvider,
    SignedClient,
};
use agentcore_core::llm::LanguageModel;
use agentcore_core::session::SessionStore;
use agentcore_core::tools::ToolBox;
use agentcore_mcp::{gateway_tools, GatewayClient};
use agentcore_runtime::providers::bedrock::SERVICE as BEDROCK_SERVICE;
use agentcore_runtime::{
    AgentBuilder, BedrockConfig, BedrockConverseModel, ConversationalAgent, OpenAiChatModel,
    OpenAiConfig,
};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer concisely.";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BEDROCK_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    OpenAi,
    Bedrock,
}

impl std::str::FromStr for ModelProvider {
    type Err = AwsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "bedrock" => Ok(Self::Bedrock),
            other => Err(AwsError::configuration(format!(
                "MODEL_PROVIDER must be `openai` or `bedrock`, got `{other}`"
            ))),
        }
    }
}

/// Where gateway tools come from, if anywhere.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub url: String,
    pub token: GatewayToken,
}

#[derive(Clone)]
pub enum GatewayToken {
    Inline(String),
    File(PathBuf),
}

impl std::fmt::Debug for GatewayToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayToken::Inline(_) => f.write_str("Inline(<redacted>)"),
            GatewayToken::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

#[derive(Clone)]
pub struct AgentSettings {
    pub provider: ModelProvider,
    pub model_id: String,
    pub openai_api_key: Option<String>,
    pub openai_api_url: Option<String>,
    pub system_prompt: String,
    pub region: String,
    pub memory_id: Option<String>,
    pub gateway: Option<GatewaySettings>,
}

impl std::fmt::Debug for AgentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSettings")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("openai_api_url", &self.openai_api_url)
            .field("region", &self.region)
            .field("memory_id", &self.memory_id)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl AgentSettings {
    /// Reads `MODEL_PROVIDER` (default `openai`), `MODEL_ID`, `OPENAI_API_KEY`,
    /// `OPENAI_API_URL`, `SYSTEM_PROMPT`, `AWS_REGION`, `MEMORY_ID`,
    /// `GATEWAY_URL` with `GATEWAY_TOKEN` or `GATEWAY_TOKEN_FILE`.
    pub fn from_env() -> AwsResult<Self> {
        let provider: ModelProvider = optional_env("MODEL_PROVIDER")
            .unwrap_or_else(|| "openai".to_string())
            .parse()?;

        let (model_id, openai_api_key) = match provider {
            ModelProvider::OpenAi => (
                optional_env("MODEL_ID").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                Some(require_env("OPENAI_API_KEY")?),
            ),
            ModelProvider::Bedrock => (
                optional_env("MODEL_ID").unwrap_or_else(|| DEFAULT_BEDROCK_MODEL.to_string()),
                None,
            ),
        };

        let gateway = match optional_env("GATEWAY_URL") {
            None => None,
            Some(url) => {
                let token = match (optional_env("GATEWAY_TOKEN"), optional_env("GATEWAY_TOKEN_FILE")) {
                    (Some(token), _) => GatewayToken::Inline(token),
                    (None, Some(path)) => GatewayToken::File(PathBuf::from(path)),
                    (None, None) => {
                        return Err(AwsError::configuration(
                            "GATEWAY_URL is set but neither GATEWAY_TOKEN nor GATEWAY_TOKEN_FILE is",
                        ))
                    }
                };
                Some(GatewaySettings { url, token })
            }
        };

        Ok(Self {
            provider,
            model_id,
            openai_api_key,
            openai_api_url: optional_env("OPENAI_API_URL"),
            system_prompt: optional_env("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            region: optional_env("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            memory_id: optional_env("MEMORY_ID"),
            gateway,
        })
    }

    fn signed_client(&self, service: &str) -> AwsResult<SignedClient> {
        SignedClient::builder(service, self.region.clone())
            .credentials(Arc::new(EnvironmentCredentialsProvider::new()))
            .build()
    }

    fn model(&self) -> anyhow::Result<Arc<dyn LanguageModel>> {
        Ok(match self.provider {
            ModelProvider::OpenAi => {
                let api_key = self
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| AwsError::configuration("OPENAI_API_KEY is required"))?;
                let config = OpenAiConfig::new(api_key, self.model_id.clone())
                    .with_api_url(self.openai_api_url.clone());
                Arc::new(OpenAiChatModel::new(config)?)
            }
            ModelProvider::Bedrock => Arc::new(BedrockConverseModel::new(
                self.signed_client(BEDROCK_SERVICE)?,
                BedrockConfig::new(self.model_id.clone()),
            )),
        })
    }

    fn session_store(&self) -> AwsResult<Option<Arc<dyn SessionStore>>> {
        match &self.memory_id {
            None => Ok(None),
            Some(memory_id) => {
                let client = self.signed_client(agentcore_aws::memory::SERVICE)?;
                let store = AgentCoreMemoryStore::new(client, memory_id.clone());
                Ok(Some(Arc::new(store)))
            }
        }
    }

    async fn tools(&self) -> anyhow::Result<Vec<ToolBox>> {
        let Some(gateway) = &self.gateway else {
            return Ok(Vec::new());
        };
        let token = match &gateway.token {
            GatewayToken::Inline(token) => token.clone(),
            GatewayToken::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| {
                    AwsError::configuration(format!(
                        "Cannot read gateway token file {}: {e}",
                        path.display()
                    ))
                })?
                .trim()
                .to_string(),
        };
        let client = GatewayClient::connect_with_token(&gateway.url, &token).await?;
        let tools = gateway_tools(Arc::new(client), None);
        tracing::info!(gateway = %gateway.url, tools = tools.len(), "Loaded gateway tools");
        Ok(tools)
    }

    /// Build the agent: model, gateway tools, and the memory-backed session
    /// store when `MEMORY_ID` is set.
    pub async fn build_agent(&self) -> anyhow::Result<ConversationalAgent> {
        let mut builder = AgentBuilder::new(self.system_prompt.clone())
            .with_name("agentcore-server")
            .with_model(self.model()?)
            .with_tools(self.tools().await?);
        if let Some(store) = self.session_store()? {
            builder = builder.with_session_store(store);
        }

        tracing::info!(
            provider = ?self.provider,
            model_id = %self.model_id,
            memory = self.memory_id.is_some(),
            "Agent configured"
        );
        builder.build()
    }
}
