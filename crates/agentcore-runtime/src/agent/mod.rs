//! Conversational agent: construction (`builder`) and the invocation loop
//! (`runtime`).

pub mod builder;
pub mod runtime;

pub use builder::AgentBuilder;
pub use runtime::ConversationalAgent;
