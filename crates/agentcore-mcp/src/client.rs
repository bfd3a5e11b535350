//! MCP client for a gateway endpoint: handshake, tool discovery, tool calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{McpError, McpResult};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, McpTool, McpToolResult,
    ToolCallParams, ToolsListResult,
};
use crate::transport::{HttpTransport, Transport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct GatewayClient {
    transport: Arc<dyn Transport>,
    request_id: AtomicU64,
    request_timeout: Duration,
    server: Option<InitializeResult>,
    tools: Vec<McpTool>,
}

impl GatewayClient {
    /// Connect to a gateway MCP URL with a bearer token and discover its tools.
    pub async fn connect_with_token(url: &str, token: &str) -> McpResult<Self> {
        let transport = HttpTransport::builder(url).bearer_token(token).build()?;
        Self::connect(Arc::new(transport)).await
    }

    #[instrument(skip(transport), name = "mcp_connect")]
    pub async fn connect(transport: Arc<dyn Transport>) -> McpResult<Self> {
        let mut client = Self {
            transport,
            request_id: AtomicU64::new(1),
            request_timeout: DEFAULT_TIMEOUT,
            server: None,
            tools: Vec::new(),
        };

        let result: InitializeResult = client
            .request("initialize", Some(InitializeParams::default()))
            .await?;
        info!(
            server = ?result.server_info.as_ref().map(|s| s.name.as_str()),
            protocol_version = %result.protocol_version,
            "MCP gateway initialized"
        );
        client.server = Some(result);
        client.notify("notifications/initialized").await?;

        client.tools = client.list_tools().await?;
        info!(tool_count = client.tools.len(), "Discovered gateway tools");
        Ok(client)
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Fetch every page of `tools/list`.
    pub async fn list_tools(&self) -> McpResult<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let page: ToolsListResult = self.request("tools/list", params).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    #[instrument(skip(self, arguments), fields(tool_name = %name))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<McpToolResult> {
        if !self.tools.iter().any(|t| t.name == name) {
            warn!(tool_name = %name, "Calling tool not advertised by the gateway");
        }
        let result: McpToolResult = self
            .request(
                "tools/call",
                Some(ToolCallParams {
                    name: name.to_string(),
                    arguments,
                }),
            )
            .await?;
        if result.is_error {
            warn!(tool_name = %name, "Tool returned error result");
        } else {
            debug!(tool_name = %name, parts = result.content.len(), "Tool call successful");
        }
        Ok(result)
    }

    async fn request<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> McpResult<R> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let params = params.map(serde_json::to_value).transpose()?;
        let message = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        let payloads = timeout(self.request_timeout, self.transport.exchange(&message))
            .await
            .map_err(|_| McpError::Timeout(self.request_timeout))??;

        // server notifications may precede the response in an event stream
        for payload in payloads {
            let response: JsonRpcResponse = serde_json::from_str(&payload)?;
            if response.id.as_ref().and_then(Value::as_u64) == Some(id) {
                let result = response.into_result()?;
                return Ok(serde_json::from_value(result)?);
            }
        }
        Err(McpError::protocol(format!("No response to {method} (id {id})")))
    }

    async fn notify(&self, method: &str) -> McpResult<()> {
        let message = serde_json::to_string(&JsonRpcRequest::notification(method))?;
        self.transport.exchange(&message).await?;
        Ok(())
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport answering with canned payload lists, one list per exchange.
    pub(crate) struct MockTransport {
        responses: Mutex<VecDeque<Vec<String>>>,
        pub(crate) sent: Mutex<Vec<Value>>,
    }

    impl MockTransport {
        pub(crate) fn new(responses: Vec<Vec<Value>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.into_iter().map(|v| v.to_string()).collect())
                        .collect(),
                ),
                sent: Mutex::new(Vec::new()),
            })
        }

        /// Handshake responses followed by one tools/list page.
        pub(crate) fn with_tools(tools: Value, mut extra: Vec<Vec<Value>>) -> Arc<Self> {
            let mut responses = vec![
                vec![json!({"jsonrpc": "2.0", "id": 1, "result": {
                    "protocolVersion": "2025-03-26",
                    "serverInfo": {"name": "gateway"}
                }})],
                vec![],
                vec![json!({"jsonrpc": "2.0", "id": 2, "result": {"tools": tools}})],
            ];
            responses.append(&mut extra);
            Self::new(responses)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn exchange(&self, message: &str) -> McpResult<Vec<String>> {
            self.sent
                .lock()
                .unwrap()
                .push(serde_json::from_str(message).unwrap());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| McpError::transport("No more mock responses"))
        }
    }

    #[tokio::test]
    async fn connect_performs_handshake_and_lists_tools() {
        let transport = MockTransport::with_tools(
            json!([{"name": "weather___get_forecast", "description": "Forecast", "inputSchema": {"type": "object"}}]),
            vec![],
        );
        let client = GatewayClient::connect(transport.clone()).await.unwrap();

        assert_eq!(client.tools().len(), 1);
        let sent = transport.sent.lock().unwrap();
        let methods: Vec<_> = sent.iter().map(|m| m["method"].as_str().unwrap().to_string()).collect();
        assert_eq!(methods, vec!["initialize", "notifications/initialized", "tools/list"]);
        assert!(sent[1].get("id").is_none());
    }

    #[tokio::test]
    async fn tools_list_follows_cursor() {
        let transport = MockTransport::new(vec![
            vec![json!({"jsonrpc": "2.0", "id": 1, "result": {"protocolVersion": "2025-03-26"}})],
            vec![],
            vec![json!({"jsonrpc": "2.0", "id": 2, "result": {"tools": [{"name": "a"}], "nextCursor": "c2"}})],
            vec![json!({"jsonrpc": "2.0", "id": 3, "result": {"tools": [{"name": "b"}]}})],
        ]);
        let client = GatewayClient::connect(transport.clone()).await.unwrap();

        let names: Vec<_> = client.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(transport.sent.lock().unwrap()[3]["params"], json!({"cursor": "c2"}));
    }

    #[tokio::test]
    async fn call_tool_skips_notifications_before_response() {
        let transport = MockTransport::with_tools(
            json!([{"name": "echo"}]),
            vec![vec![
                json!({"jsonrpc": "2.0", "method": "notifications/progress", "params": {}}),
                json!({"jsonrpc": "2.0", "id": 3, "result": {"content": [{"type": "text", "text": "hi"}]}}),
            ]],
        );
        let client = GatewayClient::connect(transport).await.unwrap();

        let result = client.call_tool("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(result.text(), "hi");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn json_rpc_error_surfaces_as_server_error() {
        let transport = MockTransport::with_tools(
            json!([]),
            vec![vec![json!({"jsonrpc": "2.0", "id": 3, "error": {"code": -32602, "message": "Invalid params"}})]],
        );
        let client = GatewayClient::connect(transport).await.unwrap();

        let err = client.call_tool("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Server(ref e) if e.code == -32602));
    }

    #[tokio::test]
    async fn missing_response_is_protocol_error() {
        let transport = MockTransport::with_tools(json!([]), vec![vec![]]);
        let client = GatewayClient::connect(transport).await.unwrap();

        let err = client.call_tool("x", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Protocol(_)));
    }
}
