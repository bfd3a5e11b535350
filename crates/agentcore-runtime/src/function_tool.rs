//! Tools backed by plain async closures.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agentcore_core::tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolResult, ToolSchema};
use async_trait::async_trait;
use serde_json::Value;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type AsyncToolFn =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<anyhow::Result<ToolResult>> + Send + Sync>;

pub struct FunctionTool {
    schema: ToolSchema,
    handler: AsyncToolFn,
}

#[async_trait]
impl Tool for FunctionTool {
    fn schema(&self) -> ToolSchema {
        self.schema.clone()
    }

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult> {
        (self.handler)(args, ctx).await
    }
}

pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Option<ToolParameterSchema>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: ToolParameterSchema) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> ToolBox
    where
        F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
    {
        let schema = match self.parameters {
            Some(parameters) => ToolSchema::new(self.name, self.description, parameters),
            None => ToolSchema::no_params(self.name, self.description),
        };
        let handler: AsyncToolFn = Arc::new(move |args, ctx| Box::pin(handler(args, ctx)));
        Arc::new(FunctionTool { schema, handler })
    }
}

/// Tool without declared parameters; the closure still receives whatever
/// arguments the model sent.
pub fn create_tool<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> ToolBox
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolResult>> + Send + 'static,
{
    ToolBuilder::new(name, description).build(handler)
}
