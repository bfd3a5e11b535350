//! AWS plumbing for AgentCore agents: credentials, SigV4 signing, a signed HTTP
//! caller and thin clients for the control-plane and data-plane calls the
//! workspace makes.
//!
//! ## Features
//!
//! - `sdk`: resolve credentials through the AWS SDK default chain
//!   (profiles, SSO, container and instance roles) via `SdkCredentialsProvider`
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentcore_aws::{GatewayConfig, GatewayControlClient, SignedClient};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let client = SignedClient::builder("bedrock-agentcore", "us-east-1").build()?;
//! let gateways = GatewayControlClient::new(client);
//!
//! let config = GatewayConfig::new(
//!     "my-gateway",
//!     "arn:aws:iam::123456789012:role/GatewayRole",
//!     "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_pool/.well-known/openid-configuration",
//! )
//! .with_allowed_client("my-client-id");
//!
//! let gateway = gateways.create_gateway(&config).await?;
//! println!("{} {:?}", gateway.gateway_id, gateway.gateway_arn);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cognito;
pub mod control;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod runtime_client;
pub mod sigv4;
pub mod ssm;

pub use client::{
    Clock, FixedClock, HttpResponse, HttpTransport, ReqwestTransport, SignedClient,
    SignedClientBuilder, SystemClock,
};
pub use cognito::{CognitoClient, UserPoolClient};
pub use control::{Gateway, GatewayConfig, GatewayControlClient, GatewayPage};
#[cfg(feature = "sdk")]
pub use credentials::SdkCredentialsProvider;
pub use credentials::{
    Credentials, CredentialsProvider, EnvironmentCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{require_env, AwsError, AwsResult};
pub use memory::AgentCoreMemoryStore;
pub use runtime_client::AgentRuntimeClient;
pub use sigv4::{HttpMethod, SigV4Signer, SignedRequest, SigningSettings, UnsignedRequest};
pub use ssm::{Parameter, ParameterStoreClient, ParameterType};
