//! Error types for migration operations.

use thiserror::Error;

/// Failure to enumerate artifacts at the source registry.
#[derive(Debug, Error)]
pub enum ListError {
    /// The source repository does not exist.
    #[error("repository not found: {0}")]
    RepositoryNotFound(String),

    /// The source answered with an error status.
    #[error("source request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The listing page could not be decoded.
    #[error("malformed listing response: {0}")]
    Decode(String),
}

/// Failure to talk to the destination open API.
#[derive(Debug, Error)]
pub enum DestinationError {
    /// The API returned an error inside the response envelope.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// The endpoint answered with a non-success HTTP status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The envelope could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(String),
}

/// Failure to build the destination existence index.
///
/// Any of these aborts index construction; no partial index is returned.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to find existing artifacts: {0}")]
    Artifacts(#[source] DestinationError),

    #[error("failed to find existing files: {0}")]
    Files(#[source] DestinationError),
}

/// Credential storage errors.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credentials are stored for the host.
    #[error("not logged in to {0}")]
    NotLoggedIn(String),

    /// The user configuration directory could not be determined.
    #[error("could not find config directory")]
    NoConfigDir,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid credentials file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize credentials: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Migration-specific errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No stored credentials for the destination host.
    #[error("Unauthorized: authentication required for {0}. Maybe you haven't logged in before.")]
    NotAuthenticated(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The source cannot be migrated by this tool.
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// The source listing produced nothing at all.
    #[error("repository {0}: no artifacts found, please check your repository or command")]
    ArtifactsNotFound(String),

    /// Source enumeration failed.
    #[error("failed to get file list: {0}")]
    List(#[from] ListError),

    /// Destination existence scan failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Destination open API failure outside of indexing.
    #[error("destination API error: {0}")]
    Destination(#[from] DestinationError),

    /// A single artifact could not be transferred.
    #[error("failed to migrate {path}: {reason}")]
    TransferFailed { path: String, reason: String },

    /// Credential storage failure.
    #[error("credential store error: {0}")]
    Credentials(#[from] CredentialError),

    /// HTTP client construction failure.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;
