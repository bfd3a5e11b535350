//! Local files: resource metadata (JSON, read-only), the gateway config
//! written after provisioning (YAML) and the cached bearer token (plain text).

use std::path::Path;

use agentcore_aws::{AwsError, AwsResult};
use serde::{Deserialize, Serialize};

/// Identifiers left behind by whatever provisioned the surrounding resources
/// (user pool, IAM role). Every field is optional; flags and environment
/// variables take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceMetadata {
    pub region: Option<String>,
    pub role_arn: Option<String>,
    pub user_pool_id: Option<String>,
    pub client_id: Option<String>,
    pub discovery_url: Option<String>,
    pub token_url: Option<String>,
    pub gateway_name: Option<String>,
}

impl ResourceMetadata {
    /// A missing file is not an error; a malformed one is.
    pub async fn load_optional(path: &Path) -> AwsResult<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                AwsError::configuration(format!("Malformed metadata file {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No metadata file");
                Ok(Self::default())
            }
            Err(e) => Err(AwsError::configuration(format!(
                "Cannot read metadata file {}: {e}",
                path.display()
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFile {
    pub gateway: GatewayEntry,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayEntry {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for GatewayEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("url", &self.url)
            .field("arn", &self.arn)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "** redacted **"))
            .finish()
    }
}

impl std::fmt::Debug for GatewayFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayFile").field("gateway", &self.gateway).finish()
    }
}

impl GatewayFile {
    pub async fn write(&self, path: &Path) -> AwsResult<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| AwsError::configuration(format!("Cannot encode gateway file: {e}")))?;
        create_parent(path).await?;
        tokio::fs::write(path, yaml).await.map_err(|e| {
            AwsError::configuration(format!("Cannot write gateway file {}: {e}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "Wrote gateway config");
        Ok(())
    }

    pub async fn read(path: &Path) -> AwsResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            AwsError::configuration(format!("Cannot read gateway file {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            AwsError::configuration(format!("Malformed gateway file {}: {e}", path.display()))
        })
    }
}

/// `None` when the file is absent or blank.
pub async fn read_token(path: &Path) -> AwsResult<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let token = raw.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AwsError::configuration(format!(
            "Cannot read token file {}: {e}",
            path.display()
        ))),
    }
}

pub async fn write_token(path: &Path, token: &str) -> AwsResult<()> {
    create_parent(path).await?;
    tokio::fs::write(path, token).await.map_err(|e| {
        AwsError::configuration(format!("Cannot write token file {}: {e}", path.display()))
    })
}

async fn create_parent(path: &Path) -> AwsResult<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AwsError::configuration(format!("Cannot create {}: {e}", dir.display()))
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn metadata_is_optional_but_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(
            ResourceMetadata::load_optional(&missing).await.unwrap(),
            ResourceMetadata::default()
        );

        let path = dir.path().join("metadata.json");
        tokio::fs::write(&path, r#"{"role_arn":"arn:aws:iam::123:role/gw","unrelated":true}"#)
            .await
            .unwrap();
        let metadata = ResourceMetadata::load_optional(&path).await.unwrap();
        assert_eq!(metadata.role_arn.as_deref(), Some("arn:aws:iam::123:role/gw"));

        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(matches!(
            ResourceMetadata::load_optional(&path).await,
            Err(AwsError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn gateway_file_is_written_as_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("gateway.yaml");
        let file = GatewayFile {
            gateway: GatewayEntry {
                id: "gw-1".into(),
                name: "demo".into(),
                url: Some("https://gw-1.example.com/mcp".into()),
                arn: None,
                client_secret: Some("s3cr3t".into()),
            },
        };
        file.write(&path).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("id: gw-1"));
        assert!(!raw.contains("arn:"));
        assert_eq!(GatewayFile::read(&path).await.unwrap(), file);
        assert!(!format!("{file:?}").contains("s3cr3t"));
    }

    #[tokio::test]
    async fn token_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        assert_eq!(read_token(&path).await.unwrap(), None);

        write_token(&path, "abc.def.ghi").await.unwrap();
        assert_eq!(read_token(&path).await.unwrap().as_deref(), Some("abc.def.ghi"));

        tokio::fs::write(&path, "  \n").await.unwrap();
        assert_eq!(read_token(&path).await.unwrap(), None);
    }
}
