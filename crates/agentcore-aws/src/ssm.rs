//! SSM Parameter Store over the JSON 1.1 protocol.

use serde::{Deserialize, Serialize};

use crate::client::SignedClient;
use crate::error::AwsResult;
use crate::sigv4::HttpMethod;

pub const SERVICE: &str = "ssm";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    String,
    StringList,
    SecureString,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(rename = "Type")]
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterResponse {
    parameter: Parameter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterRequest<'a> {
    name: &'a str,
    with_decryption: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PutParameterRequest<'a> {
    name: &'a str,
    value: &'a str,
    #[serde(rename = "Type")]
    parameter_type: ParameterType,
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PutParameterResponse {
    #[serde(default)]
    version: i64,
}

#[derive(Debug, Clone)]
pub struct ParameterStoreClient {
    client: SignedClient,
    endpoint: String,
}

impl ParameterStoreClient {
    pub fn new(client: SignedClient) -> Self {
        let endpoint = format!("https://ssm.{}.amazonaws.com/", client.region());
        Self { client, endpoint }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub async fn get_parameter(&self, name: &str, decrypt: bool) -> AwsResult<Parameter> {
        tracing::debug!(parameter = %name, "Reading SSM parameter");
        let response: GetParameterResponse = self
            .call(
                "AmazonSSM.GetParameter",
                &GetParameterRequest {
                    name,
                    with_decryption: decrypt,
                },
            )
            .await?;
        Ok(response.parameter)
    }

    /// Store a parameter and return its new version.
    pub async fn put_parameter(
        &self,
        name: &str,
        value: &str,
        secure: bool,
        overwrite: bool,
    ) -> AwsResult<i64> {
        let parameter_type = if secure {
            ParameterType::SecureString
        } else {
            ParameterType::String
        };
        let response: PutParameterResponse = self
            .call(
                "AmazonSSM.PutParameter",
                &PutParameterRequest {
                    name,
                    value,
                    parameter_type,
                    overwrite,
                },
            )
            .await?;
        tracing::info!(parameter = %name, version = response.version, "Stored SSM parameter");
        Ok(response.version)
    }

    async fn call<B, T>(&self, target: &str, body: &B) -> AwsResult<T>
    where
        B: Serialize,
        T: serde::de::DeserializeOwned,
    {
        self.client
            .send_json(
                HttpMethod::Post,
                &self.endpoint,
                Some(body),
                &[("content-type", CONTENT_TYPE), ("x-amz-target", target)],
            )
            .await
    }
}
