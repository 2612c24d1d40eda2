//! Client for the media microservice that stores thumbnails, videos and
//! lesson documents.
//!
//! Upload failures are returned to the caller; delete helpers are best
//! effort and only report what happened.

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("media service returned status {0}")]
    Status(u16),

    #[error("media service response had no url")]
    MissingUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Thumbnail,
    Video,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Thumbnail => "thumbnail",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file received from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn is_empty(&self) -> bool {
        self.filename.is_empty() || self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteResult {
    #[serde(default)]
    pub deleted: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

#[async_trait]
pub trait MediaClient: Send + Sync {
    /// Upload a file and return its public url.
    async fn upload(
        &self,
        kind: MediaKind,
        file: &UploadFile,
        user_id: &str,
    ) -> Result<String, MediaError>;

    /// Delete a single file by url or storage key.
    async fn delete_file(&self, url_or_key: &str) -> bool;

    async fn delete_files_batch(&self, urls: &[String]) -> BatchDeleteResult;
}

#[derive(Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

#[derive(Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    success: bool,
}

pub struct HttpMediaClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpMediaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to build media HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MediaClient for HttpMediaClient {
    #[instrument(skip(self, file), fields(kind = %kind, filename = %file.filename))]
    async fn upload(
        &self,
        kind: MediaKind,
        file: &UploadFile,
        user_id: &str,
    ) -> Result<String, MediaError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("user_id", user_id.to_string());

        let response = self
            .http_client
            .post(self.endpoint(&format!("/api/upload/{}", kind)))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Status(response.status().as_u16()));
        }

        let body: UploadResponse = response.json().await?;
        let url = body
            .url
            .filter(|url| !url.is_empty())
            .ok_or(MediaError::MissingUrl)?;

        tracing::info!(%url, "Uploaded {}", kind);
        Ok(url)
    }

    #[instrument(skip(self))]
    async fn delete_file(&self, url_or_key: &str) -> bool {
        if url_or_key.is_empty() {
            return false;
        }

        let result = self
            .http_client
            .delete(self.endpoint("/api/delete"))
            .json(&json!({ "url_or_key": url_or_key }))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(response) => match response.json::<DeleteResponse>().await {
                Ok(body) => body.success,
                Err(e) => {
                    tracing::warn!(error = %e, "Unexpected media delete response");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to delete media file");
                false
            }
        }
    }

    #[instrument(skip(self), fields(count = urls.len()))]
    async fn delete_files_batch(&self, urls: &[String]) -> BatchDeleteResult {
        if urls.is_empty() {
            return BatchDeleteResult::default();
        }

        let all_failed = || BatchDeleteResult {
            deleted: Vec::new(),
            failed: urls.to_vec(),
        };

        let result = self
            .http_client
            .delete(self.endpoint("/api/delete/batch"))
            .json(&json!({ "urls": urls }))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(response) => response.json::<BatchDeleteResult>().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Unexpected media batch delete response");
                all_failed()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to delete media files");
                all_failed()
            }
        }
    }
}
