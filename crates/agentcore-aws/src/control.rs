//! Gateway provisioning against the AgentCore control plane.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::client::SignedClient;
use crate::error::{AwsError, AwsResult};
use crate::sigv4::{percent_encode_segment, HttpMethod};

pub const SERVICE: &str = "bedrock-agentcore";

pub fn control_endpoint(region: &str) -> String {
    format!("https://bedrock-agentcore-control.{region}.amazonaws.com")
}

/// Parameters of a `CreateGateway` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub name: String,
    pub role_arn: String,
    pub protocol_type: String,
    pub authorizer_type: String,
    pub allowed_clients: BTreeSet<String>,
    pub discovery_url: String,
    pub description: Option<String>,
}

impl GatewayConfig {
    pub fn new(
        name: impl Into<String>,
        role_arn: impl Into<String>,
        discovery_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role_arn: role_arn.into(),
            protocol_type: "MCP".to_string(),
            authorizer_type: "CUSTOM_JWT".to_string(),
            allowed_clients: BTreeSet::new(),
            discovery_url: discovery_url.into(),
            description: None,
        }
    }

    pub fn with_allowed_client(mut self, client_id: impl Into<String>) -> Self {
        self.allowed_clients.insert(client_id.into());
        self
    }

    pub fn with_allowed_clients<I, S>(mut self, clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_clients
            .extend(clients.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Reject inputs the control plane would refuse anyway.
    pub fn validate(&self) -> AwsResult<()> {
        if self.name.trim().is_empty() {
            return Err(AwsError::configuration("Gateway name must not be empty"));
        }
        if !self.role_arn.starts_with("arn:") || !self.role_arn.contains(":iam::") {
            return Err(AwsError::configuration(format!(
                "Role ARN is not an IAM role ARN: {}",
                self.role_arn
            )));
        }
        if self.allowed_clients.is_empty() {
            return Err(AwsError::configuration(
                "At least one allowed client id is required",
            ));
        }
        url::Url::parse(&self.discovery_url).map_err(|e| {
            AwsError::configuration(format!(
                "Invalid discovery URL {}: {e}",
                self.discovery_url
            ))
        })?;
        Ok(())
    }

    fn to_request(&self) -> CreateGatewayRequest<'_> {
        CreateGatewayRequest {
            name: &self.name,
            role_arn: &self.role_arn,
            protocol_type: &self.protocol_type,
            authorizer_type: &self.authorizer_type,
            authorizer_configuration: AuthorizerConfiguration {
                custom_jwt_authorizer: CustomJwtAuthorizer {
                    allowed_clients: self.allowed_clients.iter().map(String::as_str).collect(),
                    discovery_url: &self.discovery_url,
                },
            },
            description: self.description.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGatewayRequest<'a> {
    name: &'a str,
    role_arn: &'a str,
    protocol_type: &'a str,
    authorizer_type: &'a str,
    authorizer_configuration: AuthorizerConfiguration<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AuthorizerConfiguration<'a> {
    #[serde(rename = "customJWTAuthorizer")]
    custom_jwt_authorizer: CustomJwtAuthorizer<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomJwtAuthorizer<'a> {
    allowed_clients: Vec<&'a str>,
    discovery_url: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub gateway_id: String,
    #[serde(default)]
    pub gateway_arn: Option<String>,
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayPage {
    #[serde(default)]
    pub items: Vec<Gateway>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayControlClient {
    client: SignedClient,
    endpoint: String,
}

impl GatewayControlClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = control_endpoint(client.region());
        Self { client, endpoint }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn create_gateway(&self, config: &GatewayConfig) -> AwsResult<Gateway> {
        config.validate()?;
        tracing::info!(name = %config.name, "Creating gateway");
        let gateway: Gateway = self
            .client
            .send_json(
                HttpMethod::Post,
                &format!("{}/gateways/", self.endpoint),
                Some(&config.to_request()),
                &[],
            )
            .await?;
        tracing::info!(gateway_id = %gateway.gateway_id, "Gateway created");
        Ok(gateway)
    }

    pub async fn get_gateway(&self, gateway_id: &str) -> AwsResult<Gateway> {
        self.client
            .send_json::<(), _>(HttpMethod::Get, &self.gateway_url(gateway_id), None, &[])
            .await
    }

    /// One page of gateways; pass the previous page's `next_token` to continue.
    pub async fn list_gateways(
        &self,
        max_results: Option<u32>,
        next_token: Option<&str>,
    ) -> AwsResult<GatewayPage> {
        let mut url = url::Url::parse(&format!("{}/gateways/", self.endpoint))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(max) = max_results {
                query.append_pair("maxResults", &max.to_string());
            }
            if let Some(token) = next_token {
                query.append_pair("nextToken", token);
            }
        }
        let url = url.as_str().trim_end_matches('?').to_string();
        self.client
            .send_json::<(), _>(HttpMethod::Get, &url, None, &[])
            .await
    }

    pub async fn delete_gateway(&self, gateway_id: &str) -> AwsResult<Gateway> {
        tracing::info!(gateway_id = %gateway_id, "Deleting gateway");
        self.client
            .send_json::<(), _>(HttpMethod::Delete, &self.gateway_url(gateway_id), None, &[])
            .await
    }

    fn gateway_url(&self, gateway_id: &str) -> String {
        format!(
            "{}/gateways/{}/",
            self.endpoint,
            percent_encode_segment(gateway_id)
        )
    }
}
