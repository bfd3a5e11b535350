//! `agentcore gateway create|get|list|delete`

use std::path::PathBuf;

use agentcore_aws::{cognito, control, CognitoClient, Gateway, GatewayConfig, GatewayControlClient};
use anyhow::Context;
use clap::{Args, Subcommand};

use crate::config::{resolve, Settings};
use crate::files::{GatewayEntry, GatewayFile};

#[derive(Args, Debug)]
pub struct GatewayArgs {
    #[command(subcommand)]
    pub command: GatewayCommand,
}

#[derive(Subcommand, Debug)]
pub enum GatewayCommand {
    /// Create an MCP gateway behind a custom JWT authorizer
    Create(CreateArgs),
    /// Show one gateway
    Get {
        /// Gateway identifier
        gateway_id: String,
    },
    /// List gateways, one page at a time
    List {
        #[arg(long)]
        max_results: Option<u32>,
        #[arg(long)]
        next_token: Option<String>,
    },
    /// Delete a gateway
    Delete {
        /// Gateway identifier
        gateway_id: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(long, env = "GATEWAY_NAME")]
    pub name: Option<String>,

    /// IAM role the gateway assumes
    #[arg(long, env = "ROLE_ARN")]
    pub role_arn: Option<String>,

    /// Client ids accepted by the JWT authorizer (comma separated)
    #[arg(long, env = "ALLOWED_CLIENTS", value_delimiter = ',')]
    pub allowed_clients: Vec<String>,

    /// OpenID discovery URL of the token issuer
    #[arg(long, env = "DISCOVERY_URL")]
    pub discovery_url: Option<String>,

    #[arg(long, env = "GATEWAY_DESCRIPTION")]
    pub description: Option<String>,

    /// User pool holding the app client; enables writing its secret to the config file
    #[arg(long, env = "USER_POOL_ID")]
    pub user_pool_id: Option<String>,

    /// App client whose secret goes into the config file
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// Write the gateway config (YAML) here
    #[arg(long, env = "GATEWAY_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,
}

impl CreateArgs {
    /// Flags and environment first, then the metadata file.
    pub fn gateway_config(&self, settings: &Settings) -> anyhow::Result<GatewayConfig> {
        let metadata = &settings.metadata;
        let name = resolve(self.name.clone(), metadata.gateway_name.as_ref(), "GATEWAY_NAME")?;
        let role_arn = resolve(self.role_arn.clone(), metadata.role_arn.as_ref(), "ROLE_ARN")?;
        let discovery_url = resolve(
            self.discovery_url.clone(),
            metadata.discovery_url.as_ref(),
            "DISCOVERY_URL",
        )?;

        let mut allowed: Vec<String> = self
            .allowed_clients
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if allowed.is_empty() {
            allowed.extend(metadata.client_id.clone());
        }

        let mut config =
            GatewayConfig::new(name, role_arn, discovery_url).with_allowed_clients(allowed);
        if let Some(description) = &self.description {
            config = config.with_description(description.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn execute(args: GatewayArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut client = GatewayControlClient::new(settings.signed_client(control::SERVICE).await?);
    if let Some(endpoint) = &settings.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }

    match args.command {
        GatewayCommand::Create(create) => {
            let mut cognito = CognitoClient::new(settings.signed_client(cognito::SERVICE).await?);
            if let Some(endpoint) = &settings.endpoint {
                cognito = cognito.with_endpoint(endpoint.clone());
            }
            create_gateway(&client, &cognito, &create, settings).await?;
        }
        GatewayCommand::Get { gateway_id } => {
            let gateway = client.get_gateway(&gateway_id).await?;
            println!("{}", serde_json::to_string_pretty(&gateway)?);
        }
        GatewayCommand::List {
            max_results,
            next_token,
        } => {
            let page = client
                .list_gateways(max_results, next_token.as_deref())
                .await?;
            for gateway in &page.items {
                println!(
                    "{}\t{}\t{}",
                    gateway.gateway_id,
                    gateway.name.as_deref().unwrap_or("-"),
                    gateway.status.as_deref().unwrap_or("-")
                );
            }
            if let Some(token) = page.next_token {
                println!("next token: {token}");
            }
        }
        GatewayCommand::Delete { gateway_id } => {
            let gateway = client.delete_gateway(&gateway_id).await?;
            println!(
                "Deleted gateway {} ({})",
                gateway.gateway_id,
                gateway.status.as_deref().unwrap_or("DELETING")
            );
        }
    }
    Ok(())
}

/// One create call, then the optional config file. No readiness polling.
///
/// The identifiers are printed as soon as the gateway exists so a failing
/// config-file step never hides them.
pub async fn create_gateway(
    client: &GatewayControlClient,
    cognito: &CognitoClient,
    args: &CreateArgs,
    settings: &Settings,
) -> anyhow::Result<Gateway> {
    let config = args.gateway_config(settings)?;
    let gateway = client.create_gateway(&config).await?;
    print_gateway(&gateway);

    if let Some(path) = &args.config_file {
        write_gateway_file(path, &gateway, &config, cognito, args, settings)
            .await
            .with_context(|| {
                format!(
                    "Gateway {} was created but writing {} failed",
                    gateway.gateway_id,
                    path.display()
                )
            })?;
    }
    Ok(gateway)
}

async fn write_gateway_file(
    path: &std::path::Path,
    gateway: &Gateway,
    config: &GatewayConfig,
    cognito: &CognitoClient,
    args: &CreateArgs,
    settings: &Settings,
) -> anyhow::Result<()> {
    let client_secret = match (
        args.user_pool_id.as_ref().or(settings.metadata.user_pool_id.as_ref()),
        args.client_id.as_ref().or(settings.metadata.client_id.as_ref()),
    ) {
        (Some(pool_id), Some(client_id)) => Some(cognito.client_secret(pool_id, client_id).await?),
        _ => None,
    };

    GatewayFile {
        gateway: GatewayEntry {
            id: gateway.gateway_id.clone(),
            name: gateway.name.clone().unwrap_or_else(|| config.name.clone()),
            url: gateway.gateway_url.clone(),
            arn: gateway.gateway_arn.clone(),
            client_secret,
        },
    }
    .write(path)
    .await?;
    tracing::info!(path = %path.display(), "Wrote gateway config");
    Ok(())
}

fn print_gateway(gateway: &Gateway) {
    println!("Gateway ID:  {}", gateway.gateway_id);
    if let Some(arn) = &gateway.gateway_arn {
        println!("Gateway ARN: {arn}");
    }
    if let Some(url) = &gateway.gateway_url {
        println!("Gateway URL: {url}");
    }
    if let Some(status) = &gateway.status {
        println!("Status:      {status}");
    }
}
