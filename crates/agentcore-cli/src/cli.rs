//! Command-line definitions.

use clap::{Parser, Subcommand};

use crate::commands;
use crate::config::{AwsArgs, Settings};

/// Operate AgentCore gateways, parameters, tokens and hosted agents
#[derive(Parser, Debug)]
#[command(name = "agentcore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub aws: AwsArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision and inspect MCP gateways
    Gateway(commands::gateway::GatewayArgs),

    /// Read and write SSM parameters
    Param(commands::param::ParamArgs),

    /// Obtain a bearer token for the gateway
    Token(commands::token::TokenArgs),

    /// Invoke an agent hosted on the runtime
    Invoke(commands::invoke::InvokeArgs),
}

impl Cli {
    pub async fn execute(self) -> anyhow::Result<()> {
        let settings = Settings::load(&self.aws).await?;
        tracing::debug!(region = %settings.region, profile = ?settings.profile, "Resolved settings");

        match self.command {
            Commands::Gateway(args) => commands::gateway::execute(args, &settings).await,
            Commands::Param(args) => commands::param::execute(args, &settings).await,
            Commands::Token(args) => commands::token::execute(args, &settings).await,
            Commands::Invoke(args) => commands::invoke::execute(args, &settings).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn allowed_clients_split_on_commas() {
        let cli = Cli::try_parse_from([
            "agentcore",
            "gateway",
            "create",
            "--name",
            "demo",
            "--allowed-clients",
            "a,b",
        ])
        .unwrap();
        match cli.command {
            Commands::Gateway(commands::gateway::GatewayArgs {
                command: commands::gateway::GatewayCommand::Create(create),
            }) => assert_eq!(create.allowed_clients, vec!["a", "b"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
