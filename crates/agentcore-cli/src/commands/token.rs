//! `agentcore token fetch`: bearer token for the gateway, cached in a file.

use std::path::PathBuf;

use agentcore_aws::{cognito, CognitoClient};
use clap::{Args, Subcommand};

use crate::config::{resolve, Settings};
use crate::files::{read_token, write_token, GatewayFile};
use crate::oauth::ClientCredentials;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Print a gateway access token, reusing the token file when present
    Fetch(FetchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// OAuth2 token endpoint of the user pool domain
    #[arg(long, env = "TOKEN_URL")]
    pub token_url: Option<String>,

    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// Taken from the gateway file or looked up in the user pool when omitted
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Gateway config written by `gateway create`; its client secret is used
    /// when no secret is given
    #[arg(long, env = "GATEWAY_CONFIG_FILE")]
    pub gateway_file: Option<PathBuf>,

    #[arg(long, env = "USER_POOL_ID")]
    pub user_pool_id: Option<String>,

    #[arg(long, env = "SCOPE")]
    pub scope: Option<String>,

    #[arg(long, env = "TOKEN_FILE", default_value = ".agentcore/token")]
    pub token_file: PathBuf,

    /// Ignore the cached token and fetch a new one
    #[arg(long)]
    pub force: bool,
}

pub async fn execute(args: TokenArgs, settings: &Settings) -> anyhow::Result<()> {
    match args.command {
        TokenCommand::Fetch(fetch) => {
            let token = fetch_token(&fetch, settings, &reqwest::Client::new()).await?;
            println!("{token}");
        }
    }
    Ok(())
}

/// Cached token unless `force`; otherwise a client-credentials grant whose
/// result replaces the cache.
pub async fn fetch_token(
    args: &FetchArgs,
    settings: &Settings,
    http: &reqwest::Client,
) -> anyhow::Result<String> {
    if !args.force {
        if let Some(token) = read_token(&args.token_file).await? {
            tracing::info!(path = %args.token_file.display(), "Reusing cached token");
            return Ok(token);
        }
    }

    let metadata = &settings.metadata;
    let token_url = resolve(args.token_url.clone(), metadata.token_url.as_ref(), "TOKEN_URL")?;
    let client_id = resolve(args.client_id.clone(), metadata.client_id.as_ref(), "CLIENT_ID")?;
    let from_file = match &args.gateway_file {
        Some(path) if args.client_secret.is_none() => {
            GatewayFile::read(path).await?.gateway.client_secret
        }
        _ => None,
    };
    let client_secret = match args.client_secret.clone().or(from_file) {
        Some(secret) => secret,
        None => {
            let pool_id = resolve(
                args.user_pool_id.clone(),
                metadata.user_pool_id.as_ref(),
                "CLIENT_SECRET or USER_POOL_ID",
            )?;
            let mut cognito = CognitoClient::new(settings.signed_client(cognito::SERVICE).await?);
            if let Some(endpoint) = &settings.endpoint {
                cognito = cognito.with_endpoint(endpoint.clone());
            }
            cognito.client_secret(&pool_id, &client_id).await?
        }
    };

    let token = ClientCredentials {
        token_url,
        client_id,
        client_secret,
        scope: args.scope.clone(),
    }
    .fetch_token(http)
    .await?;

    write_token(&args.token_file, &token).await?;
    tracing::info!(path = %args.token_file.display(), "Saved token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::ResourceMetadata;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> Settings {
        Settings {
            region: "us-east-1".into(),
            profile: None,
            endpoint: None,
            metadata: ResourceMetadata::default(),
        }
    }

    fn fetch_args(server: &MockServer, token_file: PathBuf) -> FetchArgs {
        FetchArgs {
            token_url: Some(format!("{}/oauth2/token", server.uri())),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            gateway_file: None,
            user_pool_id: None,
            scope: None,
            token_file,
            force: false,
        }
    }

    async fn token_server(token: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": token})))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn fetched_token_is_cached_and_reused() {
        let server = token_server("fresh").await;
        let dir = tempfile::tempdir().unwrap();
        let args = fetch_args(&server, dir.path().join("token"));
        let http = reqwest::Client::new();

        assert_eq!(fetch_token(&args, &settings(), &http).await.unwrap(), "fresh");
        assert_eq!(
            tokio::fs::read_to_string(&args.token_file).await.unwrap(),
            "fresh"
        );

        // Second call is served from the file.
        assert_eq!(fetch_token(&args, &settings(), &http).await.unwrap(), "fresh");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn force_replaces_cached_token() {
        let server = token_server("new").await;
        let dir = tempfile::tempdir().unwrap();
        let token_file = dir.path().join("token");
        tokio::fs::write(&token_file, "stale").await.unwrap();

        let args = FetchArgs {
            force: true,
            ..fetch_args(&server, token_file.clone())
        };
        let token = fetch_token(&args, &settings(), &reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(token, "new");
        assert_eq!(tokio::fs::read_to_string(&token_file).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn client_secret_is_read_from_gateway_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(wiremock::matchers::header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let gateway_file = dir.path().join("gateway.yaml");
        GatewayFile {
            gateway: crate::files::GatewayEntry {
                id: "gw".into(),
                name: "gw".into(),
                url: None,
                arn: None,
                client_secret: Some("from-file".into()),
            },
        }
        .write(&gateway_file)
        .await
        .unwrap();

        let args = FetchArgs {
            client_secret: None,
            gateway_file: Some(gateway_file),
            ..fetch_args(&server, dir.path().join("token"))
        };
        let token = fetch_token(&args, &settings(), &reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(token, "t");
    }

    #[tokio::test]
    async fn missing_secret_and_pool_is_reported() {
        let server = token_server("unused").await;
        let dir = tempfile::tempdir().unwrap();
        let args = FetchArgs {
            client_secret: None,
            ..fetch_args(&server, dir.path().join("token"))
        };
        let err = fetch_token(&args, &settings(), &reqwest::Client::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CLIENT_SECRET or USER_POOL_ID"));
    }
}
