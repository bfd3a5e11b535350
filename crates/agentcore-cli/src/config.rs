use std::path::PathBuf;
use std::sync::Arc;

use agentcore_aws::{CredentialsProvider, SignedClient};
use clap::Args;

use crate::files::ResourceMetadata;

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings shared by every command that talks to AWS.
#[derive(Args, Debug, Clone)]
pub struct AwsArgs {
    /// AWS region; falls back to the metadata file, then us-east-1
    #[arg(long, env = "AWS_REGION", global = true)]
    pub region: Option<String>,

    /// Named profile (needs the `sdk` feature)
    #[arg(long, env = "AWS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Optional JSON file with previously provisioned identifiers
    #[arg(long, env = "AGENTCORE_METADATA", default_value = "resource_metadata.json", global = true)]
    pub metadata: PathBuf,

    /// Override the service endpoint (local stacks, tests)
    #[arg(long, global = true, hide = true)]
    pub endpoint: Option<String>,
}

/// Resolved settings for one command run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub region: String,
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub metadata: ResourceMetadata,
}

impl Settings {
    pub async fn load(args: &AwsArgs) -> anyhow::Result<Self> {
        let metadata = ResourceMetadata::load_optional(&args.metadata).await?;
        let region = args
            .region
            .clone()
            .or_else(|| metadata.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        Ok(Self {
            region,
            profile: args.profile.clone(),
            endpoint: args.endpoint.clone(),
            metadata,
        })
    }

    pub async fn signed_client(&self, service: &str) -> anyhow::Result<SignedClient> {
        let credentials = self.credentials_provider().await?;
        Ok(SignedClient::builder(service, self.region.clone())
            .credentials(credentials)
            .build()?)
    }

    #[cfg(feature = "sdk")]
    async fn credentials_provider(&self) -> anyhow::Result<Arc<dyn CredentialsProvider>> {
        let provider = agentcore_aws::SdkCredentialsProvider::load(
            self.profile.as_deref(),
            Some(self.region.as_str()),
        )
        .await?;
        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "sdk"))]
    async fn credentials_provider(&self) -> anyhow::Result<Arc<dyn CredentialsProvider>> {
        if let Some(profile) = &self.profile {
            tracing::warn!(%profile, "Profiles need the `sdk` feature; using environment credentials");
        }
        Ok(Arc::new(agentcore_aws::EnvironmentCredentialsProvider::new()))
    }
}

/// First present value: flag/env, then metadata; a missing value is a
/// configuration error naming the variable.
pub fn resolve(value: Option<String>, fallback: Option<&String>, env_name: &str) -> anyhow::Result<String> {
    value
        .or_else(|| fallback.cloned())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            agentcore_aws::AwsError::configuration(format!("{env_name} is not set")).into()
        })
}
