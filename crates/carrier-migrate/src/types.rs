//! Common types for migration operations.

use crate::credentials::Credentials;
use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default page size for numbered pagination.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Source repository root URL.
    pub source_url: String,

    /// Kind of source registry.
    pub source_kind: SourceKind,

    /// Basic-auth credentials for the source, if it requires them.
    pub source_credentials: Option<Credentials>,

    /// Destination repository root URL.
    pub destination_url: String,

    /// Destination repository type.
    pub repository_type: RepositoryType,

    /// Only migrate artifacts whose path starts with this prefix.
    pub prefix: Option<String>,

    /// Skip the existence index and transfer everything.
    pub force: bool,

    /// Abort the run on the first failed transfer.
    pub fail_fast: bool,

    /// Page size used for numbered pagination.
    pub page_size: u64,

    /// Per-request timeout. `None` blocks until the server responds.
    pub request_timeout: Option<Duration>,

    /// Properties attached to every uploaded artifact.
    pub properties: Vec<(String, String)>,
}

impl MigrationConfig {
    /// Create a new migration configuration.
    pub fn new(source_url: impl Into<String>, destination_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            source_kind: SourceKind::default(),
            source_credentials: None,
            destination_url: destination_url.into(),
            repository_type: RepositoryType::default(),
            prefix: None,
            force: false,
            fail_fast: false,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
            properties: Vec::new(),
        }
    }

    /// Set the source registry kind.
    pub fn with_source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        self
    }

    /// Set source basic-auth credentials.
    pub fn with_source_credentials(mut self, credentials: Credentials) -> Self {
        self.source_credentials = Some(credentials);
        self
    }

    /// Set the destination repository type.
    pub fn with_repository_type(mut self, repository_type: RepositoryType) -> Self {
        self.repository_type = repository_type;
        self
    }

    /// Restrict the run to paths starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable or disable forced (unconditional) migration.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Enable or disable fail-fast.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set the numbered pagination page size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set a per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Attach a property to every uploaded artifact.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// The existence discipline implied by the destination repository type.
    pub fn discipline(&self) -> IndexDiscipline {
        self.repository_type.discipline()
    }

    /// Normalized source root, with `http` assumed when no scheme is given.
    pub fn source_root(&self) -> Result<url::Url> {
        let raw = self.source_url.trim();
        if raw.is_empty() {
            return Err(MigrationError::InvalidConfig(
                "source URL must not be empty".to_string(),
            ));
        }
        if raw.starts_with('/') || raw.starts_with('.') {
            return Err(MigrationError::UnsupportedSource(format!(
                "migrating from a local path is not supported: {raw}"
            )));
        }

        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let url = url::Url::parse(&with_scheme)
            .map_err(|e| MigrationError::InvalidConfig(format!("invalid src url {raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(MigrationError::UnsupportedSource(format!(
                "unsupported source scheme: {other}"
            ))),
        }
    }

    /// Check the configuration before any network call is made.
    pub fn validate(&self) -> Result<()> {
        self.source_root()?;

        if self.page_size == 0 {
            return Err(MigrationError::InvalidConfig(
                "page size must be greater than zero".to_string(),
            ));
        }

        if !self.properties.is_empty() && self.discipline() != IndexDiscipline::Package {
            return Err(MigrationError::InvalidConfig(format!(
                "properties are only supported for {} repositories",
                RepositoryType::Generic
            )));
        }

        Ok(())
    }
}

/// Source registry kinds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Plain HTTP file host with a numbered JSON listing.
    Generic,
    /// Sonatype Nexus (asset search with continuation tokens).
    #[default]
    Nexus,
    /// JFrog Artifactory (storage API deep listing).
    Jfrog,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Nexus => write!(f, "nexus"),
            Self::Jfrog => write!(f, "jfrog"),
        }
    }
}

/// Destination repository types.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryType {
    /// Generic file repository, indexed by package and version.
    #[default]
    Generic,
    /// Maven repository, indexed by file path.
    Maven,
}

impl RepositoryType {
    /// How existence is queried for this repository type.
    pub fn discipline(&self) -> IndexDiscipline {
        match self {
            Self::Generic => IndexDiscipline::Package,
            Self::Maven => IndexDiscipline::Path,
        }
    }

    /// Name used in destination host names and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Maven => "maven",
        }
    }
}

impl std::fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How destination existence is queried and keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDiscipline {
    /// Numbered pages of `package:version` keys.
    Package,
    /// Continuation-token pages of literal file paths.
    Path,
}

/// Version assigned to generic artifacts that carry none.
pub const LATEST_VERSION: &str = "latest";

/// One transferable artifact, as produced by a source lister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Path relative to the source repository root.
    pub source_path: String,

    /// Name used in reports.
    pub display_name: String,

    /// `name:version` key, when the source knows a version.
    pub package_key: Option<String>,
}

impl ArtifactRef {
    /// Create an artifact reference; the display name is the last path segment.
    pub fn new(source_path: impl Into<String>) -> Self {
        let source_path = source_path.into().trim_matches('/').to_string();
        let display_name = source_path
            .rsplit('/')
            .next()
            .unwrap_or(&source_path)
            .to_string();
        Self {
            source_path,
            display_name,
            package_key: None,
        }
    }

    /// Override the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Record the artifact version, forming the `path:version` package key.
    pub fn with_version(mut self, version: impl AsRef<str>) -> Self {
        self.package_key = Some(format!("{}:{}", self.source_path, version.as_ref()));
        self
    }

    /// Package name and version as indexed at the destination.
    pub fn package_and_version(&self) -> (&str, &str) {
        match &self.package_key {
            Some(key) => key
                .rsplit_once(':')
                .unwrap_or((key.as_str(), LATEST_VERSION)),
            None => (self.source_path.as_str(), LATEST_VERSION),
        }
    }

    /// Key used to look this artifact up in an existence index.
    pub fn existence_key(&self, discipline: IndexDiscipline) -> String {
        match discipline {
            IndexDiscipline::Path => self.source_path.clone(),
            IndexDiscipline::Package => {
                let (package, version) = self.package_and_version();
                format!("{package}:{version}")
            }
        }
    }
}
