//! # agentcore-mcp
//!
//! Minimal Model Context Protocol client for tools exposed by an AgentCore
//! gateway. It speaks JSON-RPC 2.0 over streamable HTTP with a bearer token
//! obtained from the gateway's JWT authorizer, and adapts the discovered tools
//! to the agent tool trait.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use agentcore_mcp::{gateway_tools, GatewayClient};
//!
//! let client = GatewayClient::connect_with_token(&gateway_url, &access_token).await?;
//! let tools = gateway_tools(Arc::new(client), None);
//! ```

pub mod error;
pub mod protocol;
pub mod transport;

mod client;
mod tool_adapter;

pub use client::GatewayClient;
pub use error::{McpError, McpResult};
pub use protocol::{McpContent, McpTool, McpToolResult};
pub use tool_adapter::{gateway_tools, GatewayToolAdapter};
pub use transport::{HttpTransport, Transport};
