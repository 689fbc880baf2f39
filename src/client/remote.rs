//! HTTP client for the remote secret service.
//!
//! # Wire Contract
//! ```text
//! GET    {endpoint}/v1/secrets/{path}   → 200 raw payload, X-Secret-Version
//! POST   {endpoint}/v1/secrets/{path}   → 201, X-Secret-Version
//! DELETE {endpoint}/v1/secrets/{path}   → 200 | 204
//! errors → {"code": "...", "message": "..."}
//! ```
//!
//! # Design Decisions
//! - Exactly one attempt per call, retries belong to the caller
//! - 4xx answers are public and keep their status, 5xx answers are not
//! - Known error codes are mapped back to domain errors

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::client::{ClientError, ClientResult, SecretClient, SecretPath, SecretVersion};
use crate::credential::Credential;

/// Path of the secrets API below the service endpoint.
pub const SECRETS_API: &str = "v1/secrets";

/// Response header carrying the version number of a secret.
pub const VERSION_HEADER: &str = "x-secret-version";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Secret client backed by the secret service's HTTP API.
#[derive(Clone)]
pub struct RemoteClient {
    base_url: Url,
    http: reqwest::Client,
    token: Zeroizing<String>,
}

impl RemoteClient {
    /// Build a client authenticated with `credential`.
    pub fn new(credential: &Credential, timeout: Duration) -> ClientResult<Self> {
        let mut base_url = credential.endpoint().clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("secrets-http-proxy/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        tracing::debug!(endpoint = %base_url, timeout = ?timeout, "Remote secret client configured");

        Ok(Self {
            base_url,
            http,
            token: Zeroizing::new(credential.token().to_string()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.base_url
    }

    fn secret_url(&self, path: &SecretPath) -> ClientResult<Url> {
        self.base_url
            .join(&format!("{SECRETS_API}/{path}"))
            .map_err(|e| ClientError::Transport(format!("invalid secret URL: {e}")))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = request
            .bearer_auth(self.token.as_str())
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl SecretClient for RemoteClient {
    async fn get(&self, path: &SecretPath) -> ClientResult<SecretVersion> {
        let url = self.secret_url(path)?;
        let response = self.send(self.http.get(url)).await?;
        let version = version_header(&response).or(path.version()).unwrap_or_default();
        let data = response.bytes().await.map_err(transport)?;
        Ok(SecretVersion { version, data })
    }

    async fn write(&self, path: &SecretPath, data: Bytes) -> ClientResult<u64> {
        let url = self.secret_url(path)?;
        let response = self.send(self.http.post(url).body(data)).await?;
        Ok(version_header(&response).unwrap_or_default())
    }

    async fn delete(&self, path: &SecretPath) -> ClientResult<()> {
        let url = self.secret_url(path)?;
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}

fn version_header(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return transport(e),
    };
    let body = serde_json::from_str::<ErrorBody>(&text).ok();

    match body.as_ref().and_then(|b| b.code.as_deref()) {
        Some("secret_not_found") => return ClientError::SecretNotFound,
        Some("cannot_write_to_version") => return ClientError::CannotWriteToVersion,
        Some("cannot_delete_version") => return ClientError::CannotDeleteVersion,
        Some("empty_secret") => return ClientError::EmptySecret,
        Some("secret_too_big") => return ClientError::SecretTooBig,
        Some(_) => {}
        None if status == StatusCode::NOT_FOUND => return ClientError::SecretNotFound,
        None => {}
    }

    let message = body
        .and_then(|b| b.message)
        .or_else(|| Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    if status.is_client_error() {
        ClientError::Public { status, message }
    } else if status.is_server_error() {
        ClientError::Service { status, message }
    } else {
        ClientError::InvalidResponse(format!("unexpected status {status}: {message}"))
    }
}
