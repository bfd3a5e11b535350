//! Error taxonomy for signed calls against AWS and AgentCore endpoints.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsError {
    /// No credentials could be resolved, or the resolved ones are unusable
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The service answered with a non-success status
    #[error("Remote service error {status}: {body}")]
    RemoteService { status: u16, body: String },

    /// Connection, TLS or timeout failure before a response was read
    #[error("Transport error: {0}")]
    Transport(String),

    /// Missing environment variable, malformed URL or local file
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AwsError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        AwsError::Authentication(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        AwsError::Transport(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        AwsError::Configuration(msg.into())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, AwsError::Authentication(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AwsError::Transport(_))
    }

    /// HTTP status of a remote service error.
    pub fn status(&self) -> Option<u16> {
        match self {
            AwsError::RemoteService { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<url::ParseError> for AwsError {
    fn from(err: url::ParseError) -> Self {
        AwsError::Configuration(format!("Invalid URL: {err}"))
    }
}

pub type AwsResult<T> = Result<T, AwsError>;

/// Read a required environment variable.
pub fn require_env(name: &str) -> AwsResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AwsError::configuration(format!("Missing env var: {name}")))
}
