use serde::{Deserialize, Serialize};

use crate::client::SignedClient;
use crate::error::{AwsError, AwsResult};
use crate::sigv4::HttpMethod;

pub const SERVICE: &str = "cognito-idp";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPoolClient {
    pub client_id: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub allowed_o_auth_scopes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeUserPoolClientResponse {
    user_pool_client: UserPoolClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeUserPoolClientRequest<'a> {
    user_pool_id: &'a str,
    client_id: &'a str,
}

/// Reads app-client details (notably the client secret) from a Cognito user pool.
#[derive(Debug, Clone)]
pub struct CognitoClient {
    client: SignedClient,
    endpoint: String,
}

impl CognitoClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = format!("https://cognito-idp.{}.amazonaws.com/", client.region());
        Self { client, endpoint }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn describe_user_pool_client(
        &self,
        user_pool_id: &str,
        client_id: &str,
    ) -> AwsResult<UserPoolClient> {
        let response: DescribeUserPoolClientResponse = self
            .client
            .send_json(
                HttpMethod::Post,
                &self.endpoint,
                Some(&DescribeUserPoolClientRequest {
                    user_pool_id,
                    client_id,
                }),
                &[
                    ("content-type", "application/x-amz-json-1.1"),
                    (
                        "x-amz-target",
                        "AWSCognitoIdentityProviderService.DescribeUserPoolClient",
                    ),
                ],
            )
            .await?;
        Ok(response.user_pool_client)
    }

    pub async fn client_secret(&self, user_pool_id: &str, client_id: &str) -> AwsResult<String> {
        self.describe_user_pool_client(user_pool_id, client_id)
            .await?
            .client_secret
            .ok_or_else(|| {
                AwsError::configuration(format!("App client {client_id} has no client secret"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{test_client, StubTransport};

    #[tokio::test]
    async fn returns_client_secret() {
        let transport = StubTransport::responding(
            200,
            r#"{"UserPoolClient":{"ClientId":"cid","ClientName":"gateway","ClientSecret":"shh","AllowedOAuthScopes":["gw/invoke"]}}"#,
        );
        let client = CognitoClient::new(test_client(SERVICE, transport.clone()));

        assert_eq!(client.client_secret("us-east-1_pool", "cid").await.unwrap(), "shh");
        let request = transport.last_request();
        assert_eq!(
            request.header("x-amz-target"),
            Some("AWSCognitoIdentityProviderService.DescribeUserPoolClient")
        );
        assert_eq!(
            request.body(),
            Some(br#"{"UserPoolId":"us-east-1_pool","ClientId":"cid"}"#.as_slice())
        );
    }

    #[tokio::test]
    async fn public_client_has_no_secret() {
        let transport = StubTransport::responding(200, r#"{"UserPoolClient":{"ClientId":"cid"}}"#);
        let client = CognitoClient::new(test_client(SERVICE, transport));

        let err = client.client_secret("pool", "cid").await.unwrap_err();
        assert!(matches!(err, AwsError::Configuration(_)));
    }
}
