//! `agentcore param get|put`

use agentcore_aws::{ssm, ParameterStoreClient};
use clap::{Args, Subcommand};

use crate::config::Settings;

#[derive(Args, Debug)]
pub struct ParamArgs {
    #[command(subcommand)]
    pub command: ParamCommand,
}

#[derive(Subcommand, Debug)]
pub enum ParamCommand {
    /// Print a parameter value
    Get {
        name: String,
        /// Decrypt SecureString values
        #[arg(long)]
        decrypt: bool,
    },
    /// Store a parameter value
    Put {
        name: String,
        value: String,
        /// Store as SecureString
        #[arg(long)]
        secure: bool,
        /// Replace an existing value
        #[arg(long)]
        overwrite: bool,
    },
}

pub async fn execute(args: ParamArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut client = ParameterStoreClient::new(settings.signed_client(ssm::SERVICE).await?);
    if let Some(endpoint) = &settings.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }

    match args.command {
        ParamCommand::Get { name, decrypt } => {
            let parameter = client.get_parameter(&name, decrypt).await?;
            tracing::debug!(name = %parameter.name, kind = ?parameter.parameter_type, version = ?parameter.version, "Fetched parameter");
            println!("{}", parameter.value);
        }
        ParamCommand::Put {
            name,
            value,
            secure,
            overwrite,
        } => {
            let version = client.put_parameter(&name, &value, secure, overwrite).await?;
            println!("Stored {name} (version {version})");
        }
    }
    Ok(())
}
