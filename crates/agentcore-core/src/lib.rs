//! Core traits and shared data models for agents hosted on a managed AgentCore
//! runtime. This crate stays free of HTTP and cloud dependencies so the
//! runtime, server and AWS integrations can compose it.

pub mod agent;
pub mod events;
pub mod llm;
pub mod messaging;
pub mod session;
pub mod tools;

pub use agent::{AgentDescriptor, AgentHandle};
pub use events::{
    AgentEvent, DoneEvent, EventStream, TextDeltaEvent, ToolCompletedEvent, ToolStartedEvent,
};
pub use llm::{ChunkStream, LanguageModel, LlmRequest, LlmResponse, StreamChunk};
pub use messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole};
pub use session::{AgentSession, InMemorySessionStore, SessionKey, SessionStore, Turn, TurnRole};
pub use tools::{Tool, ToolBox, ToolContext, ToolParameterSchema, ToolRegistry, ToolResult, ToolSchema};
