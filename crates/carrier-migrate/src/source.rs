//! Source registry listing.
//!
//! A [`SourceLister`] enumerates every artifact of one source repository.
//! The implementation is picked from [`SourceKind`]; pagination style is a
//! property of the kind and is never auto-detected.

use crate::credentials::Credentials;
use crate::error::{ListError, Result};
use crate::generic::GenericLister;
use crate::jfrog::JfrogLister;
use crate::nexus::NexusLister;
use crate::types::{ArtifactRef, MigrationConfig, SourceKind};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Ordered artifacts produced by one listing.
pub type ArtifactSet = Vec<ArtifactRef>;

/// Enumerates the artifacts of a source repository.
#[async_trait]
pub trait SourceLister: Send + Sync {
    /// List every artifact, in arrival order.
    async fn list(&self) -> std::result::Result<ArtifactSet, ListError>;

    /// Name of the source repository, for messages.
    fn repository(&self) -> &str;

    fn kind(&self) -> SourceKind;
}

/// Build the lister for the configured source kind.
pub fn lister_for(config: &MigrationConfig, client: Client) -> Result<Box<dyn SourceLister>> {
    let root = config.source_root()?;
    let credentials = config.source_credentials.clone();

    Ok(match config.source_kind {
        SourceKind::Generic => Box::new(GenericLister::new(
            client,
            root,
            credentials,
            config.page_size,
        )),
        SourceKind::Nexus => Box::new(NexusLister::new(client, &root, credentials)?),
        SourceKind::Jfrog => Box::new(JfrogLister::new(client, &root, credentials)?),
    })
}

/// `scheme://host[:port]` of a URL.
pub(crate) fn origin(url: &url::Url) -> String {
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    format!(
        "{}://{}{port}",
        url.scheme(),
        url.host_str().unwrap_or_default()
    )
}

/// Non-empty path segments of a URL.
pub(crate) fn path_segments(url: &url::Url) -> Vec<String> {
    url.path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// GET one listing page and decode it.
pub(crate) async fn fetch_page<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    credentials: Option<&Credentials>,
    repository: &str,
) -> std::result::Result<T, ListError> {
    let mut request = client.get(url);
    if !query.is_empty() {
        request = request.query(query);
    }
    if let Some(creds) = credentials {
        request = request.basic_auth(&creds.username, Some(&creds.password));
    }

    debug!(url = %url, ?query, "Requesting source listing page");

    let response = request
        .send()
        .await
        .map_err(|e| ListError::Network(e.to_string()))?;

    if response.status() == StatusCode::NOT_FOUND {
        return Err(ListError::RepositoryNotFound(repository.to_string()));
    }

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(ListError::Api { status, body });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ListError::Network(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| ListError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lister_selected_by_kind() {
        let client = Client::new();

        let config = MigrationConfig::new("http://files.local/dist", "https://d/p/r")
            .with_source_kind(SourceKind::Generic);
        assert_eq!(
            lister_for(&config, client.clone()).unwrap().kind(),
            SourceKind::Generic
        );

        let config = MigrationConfig::new("http://nexus.local/repository/raw", "https://d/p/r")
            .with_source_kind(SourceKind::Nexus);
        let lister = lister_for(&config, client.clone()).unwrap();
        assert_eq!(lister.kind(), SourceKind::Nexus);
        assert_eq!(lister.repository(), "raw");

        let config = MigrationConfig::new("http://jfrog.local/artifactory/libs", "https://d/p/r")
            .with_source_kind(SourceKind::Jfrog);
        let lister = lister_for(&config, client).unwrap();
        assert_eq!(lister.kind(), SourceKind::Jfrog);
        assert_eq!(lister.repository(), "libs");
    }

    #[test]
    fn test_origin_keeps_port() {
        let url = url::Url::parse("http://127.0.0.1:8081/repository/raw/").unwrap();
        assert_eq!(origin(&url), "http://127.0.0.1:8081");
        assert_eq!(path_segments(&url), vec!["repository", "raw"]);
    }
}
