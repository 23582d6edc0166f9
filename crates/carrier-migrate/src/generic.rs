//! Generic HTTP file host listing.
//!
//! The host serves a JSON index of its files at the repository root with
//! numbered pages: `GET {root}?pageNumber=N&pageSize=S` answers
//! `{"items": [{"path", "name"?, "version"?}], "totalCount": T}`.

use crate::credentials::Credentials;
use crate::error::ListError;
use crate::source::{fetch_page, path_segments, ArtifactSet, SourceLister};
use crate::types::{ArtifactRef, SourceKind};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilePage {
    #[serde(default)]
    items: Vec<FileEntry>,
    total_count: u64,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    path: String,
    name: Option<String>,
    version: Option<String>,
}

impl From<FileEntry> for ArtifactRef {
    fn from(entry: FileEntry) -> Self {
        let mut artifact = ArtifactRef::new(entry.path);
        if let Some(name) = entry.name {
            artifact = artifact.with_display_name(name);
        }
        if let Some(version) = entry.version.filter(|v| !v.is_empty()) {
            artifact = artifact.with_version(version);
        }
        artifact
    }
}

/// Lister for plain HTTP file hosts.
pub struct GenericLister {
    client: Client,
    root: url::Url,
    repository: String,
    credentials: Option<Credentials>,
    page_size: u64,
}

impl GenericLister {
    pub fn new(
        client: Client,
        root: url::Url,
        credentials: Option<Credentials>,
        page_size: u64,
    ) -> Self {
        let repository = path_segments(&root)
            .pop()
            .unwrap_or_else(|| root.host_str().unwrap_or_default().to_string());
        Self {
            client,
            root,
            repository,
            credentials,
            page_size,
        }
    }
}

#[async_trait]
impl SourceLister for GenericLister {
    async fn list(&self) -> Result<ArtifactSet, ListError> {
        let mut artifacts = ArtifactSet::new();
        let mut page_number: u64 = 1;

        loop {
            let page: FilePage = fetch_page(
                &self.client,
                self.root.as_str(),
                &[
                    ("pageNumber", page_number.to_string()),
                    ("pageSize", self.page_size.to_string()),
                ],
                self.credentials.as_ref(),
                &self.repository,
            )
            .await?;

            debug!(
                page_number,
                page_size = self.page_size,
                total_count = page.total_count,
                items = page.items.len(),
                "Fetched file list page"
            );

            let empty = page.items.is_empty();
            artifacts.extend(page.items.into_iter().map(ArtifactRef::from));

            if empty || page_number * self.page_size > page.total_count {
                break;
            }
            page_number += 1;
        }

        Ok(artifacts)
    }

    fn repository(&self) -> &str {
        &self.repository
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Generic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_body(start: usize, count: usize, total: u64) -> serde_json::Value {
        let items: Vec<_> = (start..start + count)
            .map(|i| serde_json::json!({ "path": format!("files/f{i}.bin") }))
            .collect();
        serde_json::json!({ "items": items, "totalCount": total })
    }

    #[tokio::test]
    async fn test_numbered_pages_stop_after_total() {
        let server = MockServer::start().await;

        for (page, count) in [(1, 1000), (2, 1000), (3, 500)] {
            Mock::given(method("GET"))
                .and(path("/dist"))
                .and(query_param("pageNumber", page.to_string()))
                .and(query_param("pageSize", "1000"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(page_body((page - 1) * 1000, count, 2500)),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let root = url::Url::parse(&format!("{}/dist", server.uri())).unwrap();
        let lister = GenericLister::new(Client::new(), root, None, 1000);
        let artifacts = lister.list().await.unwrap();

        assert_eq!(artifacts.len(), 2500);
        assert_eq!(artifacts[0].source_path, "files/f0.bin");
        assert_eq!(artifacts[2499].source_path, "files/f2499.bin");
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_entry_version_forms_package_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/dist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "path": "tools/cli.tar.gz", "name": "cli", "version": "1.4.0" },
                    { "path": "/tools/readme.txt" }
                ],
                "totalCount": 2
            })))
            .mount(&server)
            .await;

        let root = url::Url::parse(&format!("{}/dist", server.uri())).unwrap();
        let artifacts = GenericLister::new(Client::new(), root, None, 1000)
            .list()
            .await
            .unwrap();

        assert_eq!(artifacts[0].display_name, "cli");
        assert_eq!(
            artifacts[0].package_key.as_deref(),
            Some("tools/cli.tar.gz:1.4.0")
        );
        assert_eq!(artifacts[1].source_path, "tools/readme.txt");
        assert_eq!(artifacts[1].package_key, None);
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let root = url::Url::parse(&format!("{}/dist", server.uri())).unwrap();
        let err = GenericLister::new(Client::new(), root, None, 1000)
            .list()
            .await
            .unwrap_err();
        assert!(matches!(err, ListError::RepositoryNotFound(repo) if repo == "dist"));
    }
}
