//! Registry credential storage.
//!
//! Credentials are keyed by registry host. The file-backed store keeps them
//! in `credentials.toml` under the user configuration directory.

use crate::error::CredentialError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Basic-auth credentials for one registry host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lookup of stored credentials by registry host.
pub trait CredentialStore: Send + Sync {
    /// Credentials for `host`, or `None` when the user never logged in.
    fn get(&self, host: &str) -> Result<Option<Credentials>, CredentialError>;
}

/// In-memory store, mostly useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    hosts: RwLock<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials for `host`.
    pub fn with_host(self, host: impl Into<String>, credentials: Credentials) -> Self {
        if let Ok(mut hosts) = self.hosts.write() {
            hosts.insert(host.into(), credentials);
        }
        self
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, host: &str) -> Result<Option<Credentials>, CredentialError> {
        Ok(self
            .hosts
            .read()
            .ok()
            .and_then(|hosts| hosts.get(host).cloned()))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    hosts: BTreeMap<String, Credentials>,
}

/// TOML-file-backed credential store.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Store at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config dir>/carrier/credentials.toml`.
    pub fn default_location() -> Result<Self, CredentialError> {
        let config_dir = dirs::config_dir().ok_or(CredentialError::NoConfigDir)?;
        Ok(Self::new(config_dir.join("carrier").join("credentials.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save credentials for `host`, replacing any previous entry.
    pub fn login(&self, host: &str, credentials: Credentials) -> Result<(), CredentialError> {
        let mut file = self.load()?;
        file.hosts.insert(host.to_string(), credentials);
        self.save(&file)?;
        tracing::info!(host = %host, "Stored registry credentials");
        Ok(())
    }

    /// Remove credentials for `host`.
    pub fn logout(&self, host: &str) -> Result<(), CredentialError> {
        let mut file = self.load()?;
        if file.hosts.remove(host).is_none() {
            return Err(CredentialError::NotLoggedIn(host.to_string()));
        }
        self.save(&file)?;
        tracing::info!(host = %host, "Removed registry credentials");
        Ok(())
    }

    /// Hosts with stored credentials.
    pub fn hosts(&self) -> Result<Vec<String>, CredentialError> {
        Ok(self.load()?.hosts.into_keys().collect())
    }

    fn load(&self) -> Result<CredentialsFile, CredentialError> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn save(&self, file: &CredentialsFile) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(file)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, host: &str) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.load()?.hosts.remove(host))
    }
}
