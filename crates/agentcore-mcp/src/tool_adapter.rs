//! Exposes gateway tools as agent tools.

use std::sync::Arc;

use agentcore_core::tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::client::GatewayClient;
use crate::protocol::McpTool;

pub struct GatewayToolAdapter {
    client: Arc<GatewayClient>,
    tool: McpTool,
    namespace: Option<String>,
}

impl GatewayToolAdapter {
    pub fn new(client: Arc<GatewayClient>, tool: McpTool) -> Self {
        Self {
            client,
            tool,
            namespace: None,
        }
    }

    /// Prefix the advertised name, e.g. `gw_weather___get_forecast`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn into_toolbox(self) -> ToolBox {
        Arc::new(self)
    }

    /// Model-facing name: dashes become underscores, namespace prepended.
    fn advertised_name(&self) -> String {
        let name = self.tool.name.replace('-', "_");
        match &self.namespace {
            Some(ns) => format!("{ns}_{name}"),
            None => name,
        }
    }
}

#[async_trait]
impl Tool for GatewayToolAdapter {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            self.advertised_name(),
            self.tool.description.clone().unwrap_or_default(),
            ToolParameterSchema::from_json_schema(&self.tool.input_schema),
        )
    }

    #[instrument(skip(self, args, _ctx), fields(tool_name = %self.tool.name))]
    async fn execute(&self, args: Value, _ctx: ToolContext) -> anyhow::Result<ToolResult> {
        // the gateway only knows the original name
        let result = self.client.call_tool(&self.tool.name, args).await?;
        let text = result.text();
        if result.is_error {
            Ok(ToolResult::text(format!("Error: {text}")))
        } else {
            Ok(ToolResult::text(text))
        }
    }
}

/// Wrap every tool the client discovered.
pub fn gateway_tools(client: Arc<GatewayClient>, namespace: Option<&str>) -> Vec<ToolBox> {
    client
        .tools()
        .iter()
        .cloned()
        .map(|tool| {
            let mut adapter = GatewayToolAdapter::new(client.clone(), tool);
            if let Some(ns) = namespace {
                adapter = adapter.with_namespace(ns);
            }
            adapter.into_toolbox()
        })
        .collect()
}
