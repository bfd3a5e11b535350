//! Fluent builder for [`ConversationalAgent`].

use std::num::NonZeroUsize;
use std::sync::Arc;

use agentcore_core::agent::AgentDescriptor;
use agentcore_core::llm::LanguageModel;
use agentcore_core::session::{InMemorySessionStore, SessionStore};
use agentcore_core::tools::{ToolBox, ToolRegistry};

use super::runtime::ConversationalAgent;
use crate::prompts::build_system_prompt;

const DEFAULT_MAX_ITERATIONS: usize = 10;

pub struct AgentBuilder {
    instructions: String,
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn LanguageModel>>,
    tools: Vec<ToolBox>,
    session_store: Option<Arc<dyn SessionStore>>,
    max_iterations: NonZeroUsize,
}

impl AgentBuilder {
    /// `instructions` is the system prompt; the tool catalogue is appended to
    /// it at build time.
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            name: "agentcore-agent".to_string(),
            description: None,
            model: None,
            tools: Vec::new(),
            session_store: None,
            max_iterations: NonZeroUsize::new(DEFAULT_MAX_ITERATIONS).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_tool(mut self, tool: ToolBox) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        self.tools.extend(tools);
        self
    }

    /// Defaults to an [`InMemorySessionStore`].
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Upper bound on model calls per invocation (default 10).
    pub fn with_max_iterations(mut self, max_iterations: NonZeroUsize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> anyhow::Result<ConversationalAgent> {
        let model = self
            .model
            .ok_or_else(|| anyhow::anyhow!("A language model is required; call with_model()"))?;

        let mut registry = ToolRegistry::new();
        registry.register_all(self.tools);
        let system_prompt = build_system_prompt(&self.instructions, &registry.schemas());

        tracing::debug!(
            agent = %self.name,
            tools = ?registry.names(),
            max_iterations = self.max_iterations.get(),
            "Built conversational agent"
        );

        Ok(ConversationalAgent::new(
            AgentDescriptor {
                name: self.name,
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: self.description,
            },
            system_prompt,
            model,
            registry,
            self.session_store
                .unwrap_or_else(|| Arc::new(InMemorySessionStore::new())),
            self.max_iterations.get(),
        ))
    }
}
