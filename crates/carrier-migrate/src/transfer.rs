//! Streaming download → upload of a single artifact.

use crate::credentials::Credentials;
use crate::types::ArtifactRef;

use reqwest::header::CONTENT_LENGTH;
use reqwest::{Body, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Result of transferring one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    /// The destination accepted the upload.
    Succeeded,
    /// The destination already holds a non-overridable copy (HTTP 409).
    SkippedConflict,
    /// Download or upload failed.
    Failed(String),
}

impl TransferOutcome {
    /// Classify the upload response status.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::CONFLICT {
            Self::SkippedConflict
        } else if status.as_u16() >= 400 {
            Self::Failed(format!("got an unexpected response status: {status}"))
        } else {
            Self::Succeeded
        }
    }
}

/// Moves artifact bytes from the source root to the destination root.
///
/// The body is piped from the download response into the upload request and
/// never held in memory as a whole.
pub struct TransferPipeline {
    client: Client,
    source_root: String,
    upload_root: String,
    source_credentials: Option<Credentials>,
    destination_credentials: Credentials,
}

impl TransferPipeline {
    pub fn new(
        client: Client,
        source_root: impl Into<String>,
        upload_root: impl Into<String>,
        source_credentials: Option<Credentials>,
        destination_credentials: Credentials,
    ) -> Self {
        Self {
            client,
            source_root: source_root.into(),
            upload_root: upload_root.into(),
            source_credentials,
            destination_credentials,
        }
    }

    /// `source_path` resolved against the source root.
    pub fn download_url(&self, source_path: &str) -> String {
        format!(
            "{}/{}",
            self.source_root.trim_end_matches('/'),
            source_path.trim_matches('/')
        )
    }

    /// `source_path` resolved against the destination root.
    pub fn upload_url(&self, source_path: &str) -> String {
        format!(
            "{}/{}",
            self.upload_root.trim_end_matches('/'),
            source_path.trim_matches('/')
        )
    }

    /// Transfer one artifact and classify the outcome.
    ///
    /// Both responses are dropped before this returns, so their connections
    /// are released on every path.
    pub async fn transfer(&self, artifact: &ArtifactRef) -> TransferOutcome {
        let download_url = self.download_url(&artifact.source_path);
        let upload_url = self.upload_url(&artifact.source_path);
        debug!(download_url = %download_url, upload_url = %upload_url, "Transferring artifact");

        let mut request = self.client.get(&download_url);
        if let Some(creds) = &self.source_credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let download = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return TransferOutcome::Failed(format!(
                    "failed to download from {download_url}: {e}"
                ))
            }
        };

        let download_status = download.status();
        if download_status.is_client_error() || download_status.is_server_error() {
            return TransferOutcome::Failed(format!(
                "failed to download from {download_url}: unexpected status {download_status}"
            ));
        }

        let content_length = download.content_length();
        let mut upload = self
            .client
            .put(&upload_url)
            .basic_auth(
                &self.destination_credentials.username,
                Some(&self.destination_credentials.password),
            )
            .body(Body::wrap_stream(download.bytes_stream()));
        if let Some(len) = content_length {
            upload = upload.header(CONTENT_LENGTH, len);
        }

        match upload.send().await {
            Ok(response) => TransferOutcome::from_status(response.status()),
            Err(e) => TransferOutcome::Failed(format!("failed to push to {upload_url}: {e}")),
        }
    }
}
