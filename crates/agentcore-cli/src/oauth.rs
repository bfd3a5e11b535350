//! OAuth2 client-credentials grant against the user pool's token endpoint.

use agentcore_aws::{AwsError, AwsResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    /// Exchange the client id and secret for an access token.
    pub async fn fetch_token(&self, http: &reqwest::Client) -> AwsResult<String> {
        let mut form = vec![("grant_type", "client_credentials")];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        tracing::debug!(token_url = %self.token_url, client_id = %self.client_id, "Requesting access token");
        let response = http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await
            .map_err(|e| AwsError::transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AwsError::transport(e.to_string()))?;
        if !status.is_success() {
            return Err(AwsError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        tracing::info!(
            expires_in = ?token.expires_in,
            token_type = ?token.token_type,
            "Access token issued"
        );
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(server: &MockServer) -> ClientCredentials {
        ClientCredentials {
            token_url: format!("{}/oauth2/token", server.uri()),
            client_id: "client".into(),
            client_secret: "secret".into(),
            scope: Some("gateway/invoke".into()),
        }
    }

    #[tokio::test]
    async fn client_credentials_grant_returns_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header_exists("authorization"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("scope=gateway%2Finvoke"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "eyJ.token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let token = credentials(&server)
            .fetch_token(&reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(token, "eyJ.token");
    }

    #[tokio::test]
    async fn rejected_grant_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("{\"error\":\"invalid_client\"}"))
            .mount(&server)
            .await;

        let err = credentials(&server)
            .fetch_token(&reqwest::Client::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("invalid_client"));
    }
}
