//! AWS Signature Version 4 request signing.
//!
//! The signer is a pure function of (credentials, request, timestamp): for
//! fixed inputs it always produces the same `authorization` header, and any
//! change to the method, URL, signed headers or body changes the signature.
//!
//! ```rust,ignore
//! let signer = SigV4Signer::new("bedrock-agentcore", "us-east-1");
//! let request = UnsignedRequest::parse(HttpMethod::Post, "https://example.com/gateways/")?
//!     .with_header("content-type", "application/json")
//!     .with_body(body);
//! let signed = signer.sign(request, &credentials, Utc::now())?;
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{AwsError, AwsResult};

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const HEADER_AUTHORIZATION: &str = "authorization";
pub const HEADER_DATE: &str = "x-amz-date";
pub const HEADER_CONTENT_SHA256: &str = "x-amz-content-sha256";
pub const HEADER_SECURITY_TOKEN: &str = "x-amz-security-token";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request that has not been signed yet. Header names are stored lower-case.
#[derive(Debug, Clone)]
pub struct UnsignedRequest {
    method: HttpMethod,
    url: Url,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl UnsignedRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn parse(method: HttpMethod, url: &str) -> AwsResult<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_optional_body(mut self, body: Option<Vec<u8>>) -> Self {
        self.body = body;
        self
    }
}

/// A request carrying its signature headers. It is read-only: the signature
/// covers the exact header set and body, so nothing may change before it is
/// sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    method: HttpMethod,
    url: Url,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
}

impl SignedRequest {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Value of the `Signature=` component of the authorization header.
    pub fn signature(&self) -> Option<&str> {
        self.header(HEADER_AUTHORIZATION)
            .and_then(|auth| auth.rsplit("Signature=").next())
    }

    pub fn into_parts(self) -> (HttpMethod, Url, BTreeMap<String, String>, Option<Vec<u8>>) {
        (self.method, self.url, self.headers, self.body)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SigningSettings {
    /// Sign and send `x-amz-content-sha256`
    pub payload_checksum_header: bool,
    /// URI-encode the (already encoded) path a second time. Every service
    /// except S3 expects this.
    pub double_encode_path: bool,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            payload_checksum_header: true,
            double_encode_path: true,
        }
    }
}

/// Signs requests for one service in one region.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    service: String,
    region: String,
    settings: SigningSettings,
}

impl SigV4Signer {
    pub fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
            settings: SigningSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SigningSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn sign(
        &self,
        request: UnsignedRequest,
        credentials: &Credentials,
        time: DateTime<Utc>,
    ) -> AwsResult<SignedRequest> {
        if credentials.access_key_id().is_empty() || credentials.secret_access_key().is_empty() {
            return Err(AwsError::authentication("Credentials are empty"));
        }
        if credentials.is_expired(time) {
            return Err(AwsError::authentication(format!(
                "Credentials for {} expired at {}",
                credentials.access_key_id(),
                credentials
                    .expiry()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default()
            )));
        }

        let UnsignedRequest {
            method,
            url,
            mut headers,
            body,
        } = request;

        let amz_date = time.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = time.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(sha256(body.as_deref().unwrap_or_default()));

        headers.insert("host".to_string(), host_header(&url)?);
        headers.insert(HEADER_DATE.to_string(), amz_date.clone());
        if self.settings.payload_checksum_header {
            headers.insert(HEADER_CONTENT_SHA256.to_string(), payload_hash.clone());
        }
        if let Some(token) = credentials.session_token() {
            headers.insert(HEADER_SECURITY_TOKEN.to_string(), token.to_string());
        }

        let (canonical_request, signed_headers) =
            canonical_request(method, &url, &headers, &payload_hash, self.settings);

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            hex::encode(sha256(canonical_request.as_bytes()))
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", credentials.secret_access_key()).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        headers.insert(
            HEADER_AUTHORIZATION.to_string(),
            format!(
                "{} Credential={}/{}, SignedHeaders={}, Signature={}",
                ALGORITHM,
                credentials.access_key_id(),
                credential_scope,
                signed_headers,
                signature
            ),
        );

        tracing::trace!(
            service = %self.service,
            region = %self.region,
            method = %method,
            url = %url,
            signed_headers = %signed_headers,
            "Signed request"
        );

        Ok(SignedRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Returns the canonical request and the `;`-joined signed header list.
pub(crate) fn canonical_request(
    method: HttpMethod,
    url: &Url,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
    settings: SigningSettings,
) -> (String, String) {
    // BTreeMap keys are already sorted and lower-case
    let mut canonical_headers = String::new();
    for (name, value) in headers {
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(&normalize_header_value(value));
        canonical_headers.push('\n');
    }
    let signed_headers = headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");

    let canonical = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.as_str(),
        canonical_uri(url, settings.double_encode_path),
        canonical_query_string(url),
        canonical_headers,
        signed_headers,
        payload_hash
    );
    (canonical, signed_headers)
}

pub(crate) fn canonical_uri(url: &Url, double_encode: bool) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    if double_encode {
        uri_encode(path, false)
    } else {
        path.to_string()
    }
}

pub(crate) fn canonical_query_string(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k, true), uri_encode(&v, true)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// URI-encode per RFC 3986: unreserved characters pass through, everything
/// else becomes `%XX` with upper-case hex. `/` is kept unless `encode_slash`.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Encode a single path segment (ARNs, model ids) for use in a request URL.
pub fn percent_encode_segment(segment: &str) -> String {
    uri_encode(segment, true)
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn host_header(url: &Url) -> AwsResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AwsError::configuration(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> AwsResult<[u8; 32]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| AwsError::authentication(format!("Invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}
