//! Streamable-HTTP transport for a gateway's MCP endpoint.
//!
//! Every JSON-RPC message is one POST. The gateway answers with either a JSON
//! body or a short server-sent-event stream carrying the response; both are
//! read to completion before returning.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{McpError, McpResult};

pub const SESSION_HEADER: &str = "mcp-session-id";

/// One request/response exchange with an MCP server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post one message. Returns the raw JSON-RPC payloads found in the
    /// response (empty for an accepted notification).
    async fn exchange(&self, message: &str) -> McpResult<Vec<String>>;
}

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    headers: HashMap<String, String>,
    session_id: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn builder(url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session id assigned by the server during initialization, if any.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().ok().and_then(|guard| guard.clone())
    }
}

pub struct HttpTransportBuilder {
    url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
}

impl HttpTransportBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn bearer_token(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref().trim());
        self.header("Authorization", value)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Request timeout (default: 30s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> McpResult<HttpTransport> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| McpError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(HttpTransport {
            url: self.url,
            client,
            headers: self.headers,
            session_id: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, message: &str) -> McpResult<Vec<String>> {
        tracing::trace!(url = %self.url, "MCP HTTP send: {}", message);

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }
        if let Some(session) = self.session_id() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    McpError::transport(format!("HTTP request timed out: {e}"))
                } else {
                    McpError::transport(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if let Ok(mut guard) = self.session_id.lock() {
                *guard = Some(session.to_string());
            }
        }
        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|e| McpError::transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(McpError::Http {
                status: status.as_u16(),
                body,
            });
        }

        tracing::trace!(url = %self.url, status = status.as_u16(), "MCP HTTP response: {}", body);

        if is_event_stream {
            Ok(sse_data_payloads(&body))
        } else if body.trim().is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![body])
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // header values may hold the bearer token
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collect the `data:` payload of each event in an SSE body. Multi-line data
/// fields are joined with `\n`.
pub(crate) fn sse_data_payloads(body: &str) -> Vec<String> {
    let mut payloads = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !current.is_empty() {
                payloads.push(current.join("\n"));
                current.clear();
            }
            continue;
        }
        if let Some(data) = line.strip_prefix("data:") {
            current.push(data.strip_prefix(' ').unwrap_or(data));
        }
    }
    if !current.is_empty() {
        payloads.push(current.join("\n"));
    }
    payloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn debug_hides_header_values() {
        let transport = HttpTransport::builder("https://gw.example/mcp")
            .bearer_token("secret-token")
            .build()
            .unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn sse_payloads_are_split_per_event() {
        let body = "event: message\ndata: {\"a\":1}\n\n: comment\ndata: {\"b\":\ndata: 2}\n\n";
        assert_eq!(
            sse_data_payloads(body),
            vec!["{\"a\":1}".to_string(), "{\"b\":\n2}".to_string()]
        );
    }

    #[tokio::test]
    async fn sends_bearer_token_and_reads_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_HEADER, "sess-1")
                    .set_body_string(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::builder(format!("{}/mcp", server.uri()))
            .bearer_token("tok\n")
            .build()
            .unwrap();
        let payloads = transport.exchange("{}").await.unwrap();

        assert_eq!(payloads, vec![r#"{"jsonrpc":"2.0","id":1,"result":{}}"#.to_string()]);
        assert_eq!(transport.session_id().as_deref(), Some("sess-1"));
    }

    #[tokio::test]
    async fn unauthorized_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let transport = HttpTransport::builder(server.uri()).build().unwrap();
        let err = transport.exchange("{}").await.unwrap_err();
        assert!(err.is_unauthorized());
    }
}
