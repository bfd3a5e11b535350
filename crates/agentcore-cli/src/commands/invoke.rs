//! `agentcore invoke`: signed call to an agent hosted on the runtime.

use agentcore_aws::{runtime_client, AgentRuntimeClient};
use clap::Args;
use serde_json::json;

use crate::config::Settings;

#[derive(Args, Debug)]
pub struct InvokeArgs {
    /// Prompt sent as `{"prompt": ...}`
    pub prompt: String,

    #[arg(long, env = "AGENT_RUNTIME_ARN")]
    pub runtime_arn: String,

    /// Conversation id; a new one per run when omitted
    #[arg(long, env = "SESSION_ID")]
    pub session_id: Option<String>,

    /// Ask for server-sent events and print the transcript
    #[arg(long)]
    pub stream: bool,

    #[arg(long, default_value = runtime_client::DEFAULT_QUALIFIER)]
    pub qualifier: String,
}

pub async fn execute(args: InvokeArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut client = AgentRuntimeClient::new(settings.signed_client(runtime_client::SERVICE).await?)
        .with_qualifier(args.qualifier.clone());
    if let Some(endpoint) = &settings.endpoint {
        client = client.with_endpoint(endpoint.clone());
    }

    let session_id = args
        .session_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    tracing::info!(runtime = %args.runtime_arn, session = %session_id, stream = args.stream, "Invoking agent runtime");

    let body = client
        .invoke(
            &args.runtime_arn,
            &session_id,
            &json!({ "prompt": args.prompt }),
            args.stream,
        )
        .await?;
    println!("{body}");
    Ok(())
}
