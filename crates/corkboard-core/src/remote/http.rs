//! HTTP client for the Corkboard sync API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{BlobStore, PullResponse, PushReport, RemoteStore};
use crate::config::{has_http_scheme, RemoteConfig};
use crate::hash::ContentHash;
use crate::models::{Board, ImageMetadata};
use crate::{Error, Result};

/// HTTP client implementing both [`RemoteStore`] and [`BlobStore`].
#[derive(Clone)]
pub struct HttpRemoteClient {
    base_url: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteClient")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct PushRequest<'a> {
    boards: &'a [Board],
}

#[derive(Deserialize)]
struct UploadResponse {
    location: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl HttpRemoteClient {
    /// Builds a client from validated remote configuration.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
            client,
        })
    }

    /// Returns the base URL this client was configured with.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn resolve_location(&self, location: &str) -> String {
        if has_http_scheme(location) {
            location.to_string()
        } else {
            format!("{}/{}", self.base_url, location.trim_start_matches('/'))
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteClient {
    async fn push_boards(&self, boards: &[Board]) -> Result<PushReport> {
        let url = format!("{}/v1/boards/push", self.base_url);
        let response = self
            .authorize(self.client.post(url))
            .header("Accept", "application/json")
            .json(&PushRequest { boards })
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<PushReport>().await?)
    }

    async fn pull_boards(&self) -> Result<PullResponse> {
        let url = format!("{}/v1/boards/pull", self.base_url);
        let response = self
            .authorize(self.client.get(url))
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<PullResponse>().await?)
    }
}

#[async_trait]
impl BlobStore for HttpRemoteClient {
    async fn upload(
        &self,
        hash: &ContentHash,
        bytes: &[u8],
        metadata: &ImageMetadata,
    ) -> Result<String> {
        let url = format!(
            "{}/v1/images/{}",
            self.base_url,
            urlencoding::encode(hash.as_str())
        );
        let mut request = self
            .authorize(self.client.put(url))
            .header("Accept", "application/json")
            .header("X-Image-Width", metadata.width.to_string())
            .header("X-Image-Height", metadata.height.to_string());
        if !metadata.mime_type.trim().is_empty() {
            request = request.header(reqwest::header::CONTENT_TYPE, metadata.mime_type.trim());
        }

        let response = request.body(bytes.to_vec()).send().await?;
        let response = Self::ensure_success(response).await?;
        let payload = response.json::<UploadResponse>().await?;
        Ok(payload.location)
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(self.resolve_location(location)))
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

const MAX_ERROR_BODY_CHARS: usize = 180;

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed
    }
}
