//! Signed invocation of an agent hosted on the AgentCore runtime.

use serde_json::Value;

use crate::client::{HttpResponse, SignedClient};
use crate::error::AwsResult;
use crate::memory::data_plane_endpoint;
use crate::sigv4::{percent_encode_segment, HttpMethod};

/// Signing name for the runtime data plane.
pub const SERVICE: &str = "bedrock-agentcore";
pub const SESSION_ID_HEADER: &str = "x-amzn-bedrock-agentcore-runtime-session-id";
pub const USER_ID_HEADER: &str = "x-amzn-bedrock-agentcore-runtime-user-id";
pub const DEFAULT_QUALIFIER: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct AgentRuntimeClient {
    client: SignedClient,
    endpoint: String,
    qualifier: String,
}

impl AgentRuntimeClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = data_plane_endpoint(client.region());
        Self {
            client,
            endpoint,
            qualifier: DEFAULT_QUALIFIER.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Invoke the runtime and return the response body. With `stream` set the
    /// body is the complete server-sent event transcript.
    pub async fn invoke(
        &self,
        runtime_arn: &str,
        session_id: &str,
        payload: &Value,
        stream: bool,
    ) -> AwsResult<String> {
        let url = format!(
            "{}/runtimes/{}/invocations?qualifier={}",
            self.endpoint,
            percent_encode_segment(runtime_arn),
            percent_encode_segment(&self.qualifier)
        );
        let accept = if stream {
            "text/event-stream"
        } else {
            "application/json"
        };

        tracing::info!(runtime_arn = %runtime_arn, session_id = %session_id, "Invoking agent runtime");
        let response: HttpResponse = self
            .client
            .send(
                HttpMethod::Post,
                &url,
                Some(serde_json::to_vec(payload)?),
                &[
                    ("content-type", "application/json"),
                    ("accept", accept),
                    (SESSION_ID_HEADER, session_id),
                ],
            )
            .await?
            .error_for_status()?;
        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{test_client, StubTransport};
    use serde_json::json;

    const ARN: &str = "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/agent-abc";

    #[tokio::test]
    async fn invoke_targets_encoded_runtime_arn() {
        let transport = StubTransport::responding(200, r#"{"result":"4"}"#);
        let client = AgentRuntimeClient::new(test_client(SERVICE, transport.clone()));

        let body = client
            .invoke(ARN, "session-0123456789-0123456789-0123456789", &json!({"prompt": "2+2"}), false)
            .await
            .unwrap();
        assert_eq!(body, r#"{"result":"4"}"#);

        let request = transport.last_request();
        assert_eq!(
            request.url().as_str(),
            "https://bedrock-agentcore.us-east-1.amazonaws.com/runtimes/arn%3Aaws%3Abedrock-agentcore%3Aus-east-1%3A123456789012%3Aruntime%2Fagent-abc/invocations?qualifier=DEFAULT"
        );
        assert_eq!(
            request.header(SESSION_ID_HEADER),
            Some("session-0123456789-0123456789-0123456789")
        );
        assert_eq!(request.header("accept"), Some("application/json"));
        let auth = request.header("authorization").unwrap();
        assert!(auth.contains(SESSION_ID_HEADER));
        assert!(auth.contains("/us-east-1/bedrock-agentcore/aws4_request"));
    }

    #[tokio::test]
    async fn runtime_errors_propagate() {
        let transport = StubTransport::responding(500, "boom");
        let client = AgentRuntimeClient::new(test_client(SERVICE, transport));

        let err = client.invoke(ARN, "s", &json!({}), true).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }
}
