//! Conversational agent runtime: the invocation loop, the planner that decodes
//! tool calls from model output, and the model providers.
//!
//! ```no_run
//! use std::sync::Arc;
//! use agentcore_core::agent::AgentHandle;
//! use agentcore_core::session::SessionKey;
//! use agentcore_runtime::{create_tool, AgentBuilder, OpenAiChatModel, OpenAiConfig};
//! use agentcore_core::tools::ToolResult;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let model = OpenAiChatModel::new(OpenAiConfig::new("sk-...", "gpt-4o-mini"))?;
//! let agent = AgentBuilder::new("You are a helpful assistant.")
//!     .with_model(Arc::new(model))
//!     .with_tool(create_tool("echo", "Echo the input back", |args, _ctx| async move {
//!         Ok(ToolResult::json(args))
//!     }))
//!     .build()?;
//!
//! let reply = agent.invoke(&SessionKey::new("user", "session"), "hello").await?;
//! println!("{}", reply.text_content());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod function_tool;
pub mod planner;
pub mod prompts;
pub mod providers;

pub use agent::{AgentBuilder, ConversationalAgent};
pub use function_tool::{create_tool, FunctionTool, ToolBuilder};
pub use planner::{PlannedToolCall, PlannerDecision};
pub use providers::{BedrockConfig, BedrockConverseModel, OpenAiChatModel, OpenAiConfig};
