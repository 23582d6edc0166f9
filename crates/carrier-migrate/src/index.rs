//! Destination existence index.
//!
//! The index is built once per run from a full scan of the destination and
//! is read-only afterwards. Any error during the scan aborts construction;
//! a partially scanned destination is never returned as an index.

use crate::client::DestinationClient;
use crate::error::IndexError;
use crate::types::{ArtifactRef, IndexDiscipline};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Page size used when scanning the destination.
pub const INDEX_PAGE_SIZE: u64 = 1000;

/// Keys of artifacts already present at the destination.
#[derive(Debug, Clone)]
pub struct ExistenceIndex {
    discipline: IndexDiscipline,
    keys: HashSet<String>,
}

impl ExistenceIndex {
    pub fn new(discipline: IndexDiscipline, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            discipline,
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Whether `artifact` is already present at the destination.
    pub fn contains(&self, artifact: &ArtifactRef) -> bool {
        self.keys.contains(&artifact.existence_key(self.discipline))
    }

    pub fn discipline(&self) -> IndexDiscipline {
        self.discipline
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Builds an [`ExistenceIndex`] from the destination.
#[async_trait]
pub trait ExistenceQuery: Send + Sync {
    async fn build_index(&self) -> Result<ExistenceIndex, IndexError>;
}

/// Select the query for a discipline.
pub fn query_for(
    discipline: IndexDiscipline,
    client: Arc<DestinationClient>,
) -> Box<dyn ExistenceQuery> {
    match discipline {
        IndexDiscipline::Package => Box::new(PackageIndexQuery::new(client)),
        IndexDiscipline::Path => Box::new(PathIndexQuery::new(client)),
    }
}

/// Scans package versions with numbered pages; keys are `package:version`.
pub struct PackageIndexQuery {
    client: Arc<DestinationClient>,
    page_size: u64,
}

impl PackageIndexQuery {
    pub fn new(client: Arc<DestinationClient>) -> Self {
        Self {
            client,
            page_size: INDEX_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl ExistenceQuery for PackageIndexQuery {
    async fn build_index(&self) -> Result<ExistenceIndex, IndexError> {
        let target = self.client.target();
        info!(
            open_api = %target.open_api_url,
            project = %target.project,
            repository = %target.repository,
            "Scanning destination artifacts"
        );

        let mut keys = HashSet::new();
        let mut page_number: u64 = 1;
        loop {
            let data = self
                .client
                .describe_team_artifacts(page_number, self.page_size)
                .await
                .map_err(IndexError::Artifacts)?;

            debug!(
                page_number,
                page_size = self.page_size,
                total_count = data.total_count,
                "Fetched destination artifacts page"
            );

            keys.extend(
                data.instance_set
                    .into_iter()
                    .map(|i| format!("{}:{}", i.package, i.package_version)),
            );

            if page_number * self.page_size > data.total_count {
                break;
            }
            page_number += 1;
        }

        Ok(ExistenceIndex::new(IndexDiscipline::Package, keys))
    }
}

/// Scans repository files with continuation pages; keys are file paths.
pub struct PathIndexQuery {
    client: Arc<DestinationClient>,
    page_size: u64,
}

impl PathIndexQuery {
    pub fn new(client: Arc<DestinationClient>) -> Self {
        Self {
            client,
            page_size: INDEX_PAGE_SIZE,
        }
    }
}

#[async_trait]
impl ExistenceQuery for PathIndexQuery {
    async fn build_index(&self) -> Result<ExistenceIndex, IndexError> {
        let target = self.client.target();
        info!(
            open_api = %target.open_api_url,
            project = %target.project,
            repository = %target.repository,
            "Scanning destination files"
        );

        let mut keys = HashSet::new();
        let mut continuation_token = String::new();
        loop {
            let data = self
                .client
                .describe_file_list(&continuation_token, self.page_size)
                .await
                .map_err(IndexError::Files)?;

            debug!(
                page_size = self.page_size,
                result_size = data.instance_set.len(),
                continuation_token = data.continuation_token.as_deref().unwrap_or(""),
                "Fetched destination files page"
            );

            if data.instance_set.is_empty() {
                break;
            }
            keys.extend(
                data.instance_set
                    .into_iter()
                    .map(|f| f.path.trim_matches('/').to_string()),
            );

            match data.continuation_token {
                Some(token) if !token.is_empty() => continuation_token = token,
                _ => break,
            }
        }

        Ok(ExistenceIndex::new(IndexDiscipline::Path, keys))
    }
}
