//! # Carrier Migration Engine
//!
//! This crate moves artifacts from a source package registry (a generic file
//! host, Nexus or JFrog Artifactory) into a destination artifact repository.
//!
//! ## Features
//!
//! - **Incremental**: the destination is indexed first and artifacts already
//!   present are never transferred again
//! - **Streaming**: each artifact is piped from the source download straight
//!   into the destination upload
//! - **Failure policy**: best-effort by default, fail-fast on request; HTTP 409
//!   conflicts are always recorded as skips
//! - **Reporting**: every attempted artifact lands in exactly one of the
//!   succeeded, skipped or failed lists
//!
//! ## Example
//!
//! ```rust,ignore
//! use carrier_migrate::{FileCredentialStore, MigrationConfig, Migrator, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MigrationConfig::new(
//!         "http://nexus.internal/repository/raw-releases/",
//!         "https://acme-generic.pkg.coding.net/demo/releases/",
//!     )
//!     .with_source_kind(SourceKind::Nexus)
//!     .with_fail_fast(true);
//!
//!     let store = FileCredentialStore::default_location()?;
//!     let report = Migrator::new(config, &store)?.migrate().await?;
//!
//!     report.print_summary()?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credentials;
pub mod error;
pub mod generic;
pub mod index;
pub mod jfrog;
pub mod migrator;
pub mod nexus;
pub mod progress;
pub mod report;
pub mod source;
pub mod transfer;
pub mod types;

// Re-export main types
pub use client::{registry_host, DestinationClient, DestinationTarget};
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use error::{CredentialError, DestinationError, IndexError, ListError, MigrationError, Result};
pub use index::{ExistenceIndex, ExistenceQuery};
pub use migrator::{filter_candidates, Migrator};
pub use progress::{ConsoleProgressReporter, MigrationPhase, MigrationProgress, ProgressCallback};
pub use report::{MigrationReport, ReportEntry, RunOutcome};
pub use source::{ArtifactSet, SourceLister};
pub use transfer::{TransferOutcome, TransferPipeline};
pub use types::*;

/// Version of the migration engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
