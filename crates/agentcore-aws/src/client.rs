//! Authenticated HTTP caller: sign, send, read the whole response.
//!
//! One call is exactly one request. Non-success statuses are returned to the
//! caller untouched by [`SignedClient::send`]; [`SignedClient::send_json`]
//! turns them into [`AwsError::RemoteService`]. Nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credentials::{CredentialsProvider, EnvironmentCredentialsProvider};
use crate::error::{AwsError, AwsResult};
use crate::sigv4::{HttpMethod, SigV4Signer, SignedRequest, UnsignedRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status, headers and full body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> AwsResult<T> {
        if self.body.is_empty() {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn error_for_status(self) -> AwsResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(AwsError::RemoteService {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Moves a signed request over the network.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: SignedRequest) -> AwsResult<HttpResponse>;
}

/// `reqwest`-backed transport with a single client-level timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> AwsResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> AwsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agentcore-kit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AwsError::transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: SignedRequest) -> AwsResult<HttpResponse> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = self.client.request(method.into(), url.clone());
        for (name, value) in &headers {
            // reqwest derives Host from the URL; it is still covered by the signature
            if name != "host" {
                builder = builder.header(name, value);
            }
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AwsError::transport(format!("HTTP request to {url} failed: {e}")))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| AwsError::transport(format!("Failed to read response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Source of the signing timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Signer + credentials + transport.
#[derive(Clone)]
pub struct SignedClient {
    signer: SigV4Signer,
    credentials: Arc<dyn CredentialsProvider>,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl SignedClient {
    pub fn builder(service: impl Into<String>, region: impl Into<String>) -> SignedClientBuilder {
        SignedClientBuilder::new(service, region)
    }

    pub fn service(&self) -> &str {
        self.signer.service()
    }

    pub fn region(&self) -> &str {
        self.signer.region()
    }

    /// Current time according to the signing clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Sign and send one request. The response is returned whatever its status.
    pub async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<Vec<u8>>,
        headers: &[(&str, &str)],
    ) -> AwsResult<HttpResponse> {
        let mut request = UnsignedRequest::parse(method, url)?.with_optional_body(body);
        for (name, value) in headers {
            request = request.with_header(name, *value);
        }

        let credentials = self.credentials.credentials().await?;
        let signed = self.signer.sign(request, &credentials, self.clock.now())?;

        tracing::debug!(
            service = %self.signer.service(),
            method = %method,
            url = %url,
            "Sending signed request"
        );
        let response = self.transport.send(signed).await?;
        tracing::debug!(
            service = %self.signer.service(),
            url = %url,
            status = response.status,
            body_len = response.body.len(),
            "Received response"
        );
        Ok(response)
    }

    /// Send a JSON body (if any) and decode a JSON response. Non-2xx statuses
    /// become [`AwsError::RemoteService`].
    pub async fn send_json<B, T>(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> AwsResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = body.map(serde_json::to_vec).transpose()?;
        let mut all_headers: Vec<(&str, &str)> = Vec::with_capacity(headers.len() + 1);
        if payload.is_some() && !headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("content-type")) {
            all_headers.push(("content-type", "application/json"));
        }
        all_headers.extend_from_slice(headers);

        let response = self.send(method, url, payload, &all_headers).await?;
        if !response.is_success() {
            tracing::warn!(
                service = %self.signer.service(),
                url = %url,
                status = response.status,
                "Remote service returned an error"
            );
        }
        response.error_for_status()?.json()
    }
}

impl std::fmt::Debug for SignedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedClient")
            .field("service", &self.signer.service())
            .field("region", &self.signer.region())
            .finish()
    }
}

pub struct SignedClientBuilder {
    signer: SigV4Signer,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    transport: Option<Arc<dyn HttpTransport>>,
    clock: Option<Arc<dyn Clock>>,
    timeout: Duration,
}

impl SignedClientBuilder {
    pub fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            signer: SigV4Signer::new(service, region),
            credentials: None,
            transport: None,
            clock: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn signer(mut self, signer: SigV4Signer) -> Self {
        self.signer = signer;
        self
    }

    pub fn credentials(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Client-level timeout for the default transport (default: 30s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> AwsResult<SignedClient> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::with_timeout(self.timeout)?),
        };
        Ok(SignedClient {
            signer: self.signer,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(EnvironmentCredentialsProvider::new())),
            transport,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_exact_status_and_body_from_transport() {
        let transport = StubTransport::responding(418, "{\"message\":\"teapot\"}");
        let client = test_client("bedrock-agentcore", transport.clone());

        let response = client
            .send(HttpMethod::Get, "https://example.com/gateways/", None, &[])
            .await
            .unwrap();

        assert_eq!(response.status, 418);
        assert_eq!(response.text(), "{\"message\":\"teapot\"}");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_transport_error() {
        let client = test_client("bedrock-agentcore", StubTransport::failing("connection refused"));

        let err = client
            .send(HttpMethod::Get, "https://example.com/", None, &[])
            .await
            .unwrap_err();

        assert!(err.is_transport(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn requests_are_signed_before_transmission() {
        let transport = StubTransport::responding(200, "{}");
        let client = test_client("ssm", transport.clone());

        let _: Value = client
            .send_json(
                HttpMethod::Post,
                "https://ssm.us-east-1.amazonaws.com/",
                Some(&json!({"Name": "/app/key"})),
                &[("x-amz-target", "AmazonSSM.GetParameter")],
            )
            .await
            .unwrap();

        let request = transport.last_request();
        let auth = request.header("authorization").unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20250101/us-east-1/ssm/aws4_request"));
        assert!(auth.contains("content-type;host;x-amz-content-sha256;x-amz-date;x-amz-target"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body(), Some(br#"{"Name":"/app/key"}"#.as_slice()));
    }

    #[tokio::test]
    async fn send_json_maps_non_success_to_remote_error() {
        let transport = StubTransport::responding(400, "{\"message\":\"bad\"}");
        let client = test_client("ssm", transport);

        let err = client
            .send_json::<Value, Value>(HttpMethod::Post, "https://example.com/", None, &[])
            .await
            .unwrap_err();

        match err {
            AwsError::RemoteService { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "{\"message\":\"bad\"}");
            }
            other => panic!("expected remote service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reqwest_transport_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gateways/"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"gatewayId": "gw-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = SignedClient::builder("bedrock-agentcore", "us-east-1")
            .credentials(Arc::new(crate::credentials::StaticCredentialsProvider::new(
                crate::credentials::Credentials::new("AKID", "secret", None, None),
            )))
            .build()
            .unwrap();

        let created: Value = client
            .send_json(
                HttpMethod::Post,
                &format!("{}/gateways/", server.uri()),
                Some(&json!({"name": "gw"})),
                &[],
            )
            .await
            .unwrap();

        assert_eq!(created["gatewayId"], "gw-1");
    }

    #[tokio::test]
    async fn reqwest_transport_connection_failure() {
        let client = SignedClient::builder("s", "us-east-1")
            .credentials(Arc::new(crate::credentials::StaticCredentialsProvider::new(
                crate::credentials::Credentials::new("AKID", "secret", None, None),
            )))
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let err = client
            .send(HttpMethod::Get, "http://127.0.0.1:1/", None, &[])
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn empty_body_decodes_as_null() {
        let response = HttpResponse {
            status: 204,
            headers: BTreeMap::new(),
            body: Vec::new(),
        };
        let value: Value = response.json().unwrap();
        assert!(value.is_null());
    }

    struct NoCredentials;

    #[async_trait]
    impl crate::credentials::CredentialsProvider for NoCredentials {
        async fn credentials(&self) -> AwsResult<crate::credentials::Credentials> {
            Err(AwsError::authentication("no credentials configured"))
        }
    }

    #[tokio::test]
    async fn unresolvable_credentials_fail_before_transmission() {
        let transport = StubTransport::responding(200, "{}");
        let client = SignedClient::builder("bedrock-agentcore", "us-east-1")
            .credentials(Arc::new(NoCredentials))
            .transport(transport.clone())
            .build()
            .unwrap();

        let err = client
            .send(HttpMethod::Get, "https://example.com/gateways/", None, &[])
            .await
            .unwrap_err();

        assert!(err.is_authentication(), "unexpected error: {err:?}");
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
