//! Sonatype Nexus asset listing.

use crate::credentials::Credentials;
use crate::error::{ListError, MigrationError, Result};
use crate::source::{fetch_page, origin, path_segments, ArtifactSet, SourceLister};
use crate::types::{ArtifactRef, SourceKind};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Nexus REST API response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetsPage {
    #[serde(default)]
    items: Vec<NexusAsset>,
    continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct NexusAsset {
    path: String,
    download_url: Option<String>,
    repository: Option<String>,
    format: Option<String>,
}

/// Lister for Nexus repositories, paged by continuation token.
pub struct NexusLister {
    client: Client,
    assets_url: String,
    repository: String,
    credentials: Option<Credentials>,
}

impl NexusLister {
    /// Create a lister from a `.../repository/{name}` source URL.
    pub fn new(client: Client, root: &url::Url, credentials: Option<Credentials>) -> Result<Self> {
        let segments = path_segments(root);
        let marker = segments
            .iter()
            .position(|s| s == "repository")
            .filter(|i| i + 1 < segments.len())
            .ok_or_else(|| {
                MigrationError::InvalidConfig(format!(
                    "nexus src url must contain /repository/{{name}}: {root}"
                ))
            })?;
        // Asset paths are repository-relative and downloads resolve against
        // the source URL, so it has to end at the repository.
        if segments.len() > marker + 2 {
            return Err(MigrationError::InvalidConfig(format!(
                "nexus src url must end at /repository/{{name}}, use --prefix to select a folder: {root}"
            )));
        }

        let context: String = segments[..marker]
            .iter()
            .map(|s| format!("/{s}"))
            .collect();

        Ok(Self {
            client,
            assets_url: format!("{}{context}/service/rest/v1/assets", origin(root)),
            repository: segments[marker + 1].clone(),
            credentials,
        })
    }
}

#[async_trait]
impl SourceLister for NexusLister {
    async fn list(&self) -> std::result::Result<ArtifactSet, ListError> {
        let mut artifacts = ArtifactSet::new();
        let mut continuation_token = String::new();

        loop {
            let mut query = vec![("repository", self.repository.clone())];
            if !continuation_token.is_empty() {
                query.push(("continuationToken", continuation_token.clone()));
            }

            let page: AssetsPage = fetch_page(
                &self.client,
                &self.assets_url,
                &query,
                self.credentials.as_ref(),
                &self.repository,
            )
            .await?;

            debug!(
                items = page.items.len(),
                continuation_token = page.continuation_token.as_deref().unwrap_or(""),
                "Fetched nexus assets page"
            );

            if page.items.is_empty() {
                break;
            }
            artifacts.extend(page.items.into_iter().map(|a| ArtifactRef::new(a.path)));

            match page.continuation_token {
                Some(token) if !token.is_empty() => continuation_token = token,
                _ => break,
            }
        }

        Ok(artifacts)
    }

    fn repository(&self) -> &str {
        &self.repository
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Nexus
    }
}
