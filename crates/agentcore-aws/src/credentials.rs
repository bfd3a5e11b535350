//! Credential sources for request signing.
//!
//! Credentials are resolved per call and never persisted. Temporary
//! credentials carry a session token and an expiry; refreshing them is the job
//! of the underlying provider (the SDK chain when the `sdk` feature is on).

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AwsError, AwsResult};

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    expiry: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
        expiry: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiry,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|expiry| expiry <= now).unwrap_or(false)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &self.session_token.as_ref().map(|_| "** redacted **"))
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn credentials(&self) -> AwsResult<Credentials>;
}

/// Fixed credentials, mostly for tests and short-lived scripts.
#[derive(Debug, Clone)]
pub struct StaticCredentialsProvider {
    credentials: Credentials,
}

impl StaticCredentialsProvider {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn credentials(&self) -> AwsResult<Credentials> {
        Ok(self.credentials.clone())
    }
}

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
/// `AWS_SESSION_TOKEN` on every call.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentCredentialsProvider;

impl EnvironmentCredentialsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EnvironmentCredentialsProvider {
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> AwsResult<Credentials> {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let access_key = read(ENV_ACCESS_KEY_ID).ok_or_else(|| {
            AwsError::authentication(format!("{ENV_ACCESS_KEY_ID} is not set"))
        })?;
        let secret_key = read(ENV_SECRET_ACCESS_KEY).ok_or_else(|| {
            AwsError::authentication(format!("{ENV_SECRET_ACCESS_KEY} is not set"))
        })?;
        Ok(Credentials::new(
            access_key,
            secret_key,
            read(ENV_SESSION_TOKEN),
            None,
        ))
    }
}

#[async_trait]
impl CredentialsProvider for EnvironmentCredentialsProvider {
    async fn credentials(&self) -> AwsResult<Credentials> {
        Self::resolve(|name| std::env::var(name).ok())
    }
}

/// Credentials from the AWS SDK default chain (environment, shared config and
/// credentials files, SSO, container and instance roles), optionally pinned to
/// a named profile.
#[cfg(feature = "sdk")]
#[derive(Clone)]
pub struct SdkCredentialsProvider {
    provider: aws_credential_types::provider::SharedCredentialsProvider,
    profile: Option<String>,
}

#[cfg(feature = "sdk")]
impl SdkCredentialsProvider {
    pub async fn load(profile: Option<&str>, region: Option<&str>) -> AwsResult<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let config = loader.load().await;
        let provider = config.credentials_provider().ok_or_else(|| {
            AwsError::authentication(format!(
                "No credentials provider resolvable for profile {}",
                profile.unwrap_or("default")
            ))
        })?;
        Ok(Self {
            provider,
            profile: profile.map(str::to_string),
        })
    }
}

#[cfg(feature = "sdk")]
#[async_trait]
impl CredentialsProvider for SdkCredentialsProvider {
    async fn credentials(&self) -> AwsResult<Credentials> {
        use aws_credential_types::provider::ProvideCredentials;

        let creds = self.provider.provide_credentials().await.map_err(|e| {
            AwsError::authentication(format!(
                "Failed to resolve credentials for profile {}: {e}",
                self.profile.as_deref().unwrap_or("default")
            ))
        })?;
        Ok(Credentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token().map(str::to_string),
            creds.expiry().map(DateTime::<Utc>::from),
        ))
    }
}

#[cfg(feature = "sdk")]
impl fmt::Debug for SdkCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCredentialsProvider")
            .field("profile", &self.profile)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = Credentials::new("AKIDEXAMPLE", "super-secret", Some("token-value".into()), None);
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("token-value"));
    }

    #[test]
    fn expiry_is_inclusive() {
        let expiry = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let creds = Credentials::new("a", "b", None, Some(expiry));
        assert!(!creds.is_expired(expiry - chrono::Duration::seconds(1)));
        assert!(creds.is_expired(expiry));

        let forever = Credentials::new("a", "b", None, None);
        assert!(!forever.is_expired(expiry));
    }

    #[tokio::test]
    async fn static_provider_returns_its_credentials() {
        let creds = Credentials::new("a", "b", None, None);
        let provider = StaticCredentialsProvider::new(creds.clone());
        assert_eq!(provider.credentials().await.unwrap(), creds);
    }

    #[test]
    fn environment_without_keys_is_an_authentication_error() {
        let err = EnvironmentCredentialsProvider::resolve(|_| None).unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains(ENV_ACCESS_KEY_ID));

        let err = EnvironmentCredentialsProvider::resolve(|name| {
            (name == ENV_ACCESS_KEY_ID).then(|| "AKID".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(ENV_SECRET_ACCESS_KEY));
    }

    #[test]
    fn environment_keys_and_session_token_are_read() {
        let creds = EnvironmentCredentialsProvider::resolve(|name| match name {
            ENV_ACCESS_KEY_ID => Some("AKID".into()),
            ENV_SECRET_ACCESS_KEY => Some("secret".into()),
            ENV_SESSION_TOKEN => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.session_token(), None);
    }
}
