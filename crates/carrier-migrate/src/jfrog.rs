//! JFrog Artifactory listing through the storage API.

use crate::credentials::Credentials;
use crate::error::{ListError, MigrationError, Result};
use crate::source::{fetch_page, origin, path_segments, ArtifactSet, SourceLister};
use crate::types::{ArtifactRef, SourceKind};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<JfrogFile>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct JfrogFile {
    uri: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    folder: bool,
}

/// Lister for Artifactory repositories.
///
/// The source URL has the shape `/{context}/{repository}[/{folder}...]`;
/// listed paths are relative to that URL.
pub struct JfrogLister {
    client: Client,
    list_url: String,
    repository: String,
    credentials: Option<Credentials>,
}

impl JfrogLister {
    pub fn new(client: Client, root: &url::Url, credentials: Option<Credentials>) -> Result<Self> {
        let segments = path_segments(root);
        if segments.len() < 2 {
            return Err(MigrationError::InvalidConfig(format!(
                "jfrog src url must match /{{context}}/{{repository}}: {root}"
            )));
        }

        let folder: String = segments[2..].iter().map(|s| format!("/{s}")).collect();
        let list_url = format!(
            "{}/{}/api/storage/{}{folder}?list&deep=1&listFolders=0",
            origin(root),
            segments[0],
            segments[1],
        );

        Ok(Self {
            client,
            list_url,
            repository: segments[1].clone(),
            credentials,
        })
    }
}

#[async_trait]
impl SourceLister for JfrogLister {
    async fn list(&self) -> std::result::Result<ArtifactSet, ListError> {
        let listing: FileList = fetch_page(
            &self.client,
            &self.list_url,
            &[],
            self.credentials.as_ref(),
            &self.repository,
        )
        .await?;

        debug!(files = listing.files.len(), "Fetched jfrog file list");

        Ok(listing
            .files
            .into_iter()
            .filter(|f| !f.folder)
            .map(|f| ArtifactRef::new(f.uri))
            .collect())
    }

    fn repository(&self) -> &str {
        &self.repository
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Jfrog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_list_url_includes_folder() {
        let root = url::Url::parse("https://jfrog.local/artifactory/generic-local/release/v1/")
            .unwrap();
        let lister = JfrogLister::new(Client::new(), &root, None).unwrap();
        assert_eq!(
            lister.list_url,
            "https://jfrog.local/artifactory/api/storage/generic-local/release/v1?list&deep=1&listFolders=0"
        );
        assert_eq!(lister.repository, "generic-local");
    }

    #[tokio::test]
    async fn test_lists_files_and_skips_folders() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/artifactory/api/storage/generic-local"))
            .and(query_param("deep", "1"))
            .and(basic_auth("reader", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "uri": "http://jfrog/artifactory/api/storage/generic-local",
                "files": [
                    { "uri": "/bin/app-1.0.zip", "size": 1024, "folder": false },
                    { "uri": "/bin", "size": -1, "folder": true },
                    { "uri": "/docs/guide.pdf", "size": 2048, "folder": false }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let root = url::Url::parse(&format!("{}/artifactory/generic-local", server.uri())).unwrap();
        let artifacts = JfrogLister::new(Client::new(), &root, Some(Credentials::new("reader", "pw")))
            .unwrap()
            .list()
            .await
            .unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].source_path, "bin/app-1.0.zip");
        assert_eq!(artifacts[0].display_name, "app-1.0.zip");
        assert_eq!(artifacts[1].source_path, "docs/guide.pdf");
    }

    #[tokio::test]
    async fn test_malformed_listing() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let root = url::Url::parse(&format!("{}/artifactory/libs", server.uri())).unwrap();
        let err = JfrogLister::new(Client::new(), &root, None)
            .unwrap()
            .list()
            .await
            .unwrap_err();
        assert!(matches!(err, ListError::Decode(_)));
    }
}
