//! Migration orchestrator.
//!
//! A run moves through `Listing → Indexing → Filtering → Transferring →
//! Reporting → Done`. Setup failures (credentials, URLs, listing, indexing)
//! are returned as errors. Once filtering has run, the outcome is recorded in
//! the returned [`MigrationReport`], including fail-fast and cancellation
//! aborts, so the caller can always render what was accumulated.

use crate::client::{build_http_client, DestinationClient, DestinationTarget};
use crate::credentials::CredentialStore;
use crate::error::{MigrationError, Result};
use crate::index::{query_for, ExistenceIndex, ExistenceQuery};
use crate::progress::{MigrationPhase, MigrationProgress};
use crate::report::{MigrationReport, RunOutcome};
use crate::source::{lister_for, ArtifactSet, SourceLister};
use crate::transfer::{TransferOutcome, TransferPipeline};
use crate::types::{ArtifactRef, MigrationConfig};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Artifacts left after filtering.
#[derive(Debug, Clone, Default)]
pub struct FilteredSet {
    /// Artifacts matching the prefix filter, before the existence filter.
    pub matched: usize,
    /// Artifacts to transfer, in listing order, one per path.
    pub candidates: ArtifactSet,
}

/// Apply the prefix filter, then the existence filter.
///
/// Duplicate paths collapse to their first occurrence.
pub fn filter_candidates(
    artifacts: ArtifactSet,
    prefix: Option<&str>,
    index: Option<&ExistenceIndex>,
) -> FilteredSet {
    let prefix = prefix
        .map(|p| p.trim_start_matches('/'))
        .filter(|p| !p.is_empty());

    let matching: Vec<ArtifactRef> = artifacts
        .into_iter()
        .filter(|a| prefix.map_or(true, |p| a.source_path.starts_with(p)))
        .collect();
    let matched = matching.len();

    let mut seen = HashSet::new();
    let candidates = matching
        .into_iter()
        .filter(|a| !index.is_some_and(|i| i.contains(a)))
        .filter(|a| seen.insert(a.source_path.clone()))
        .collect();

    FilteredSet {
        matched,
        candidates,
    }
}

/// Drives one migration run.
pub struct Migrator {
    config: MigrationConfig,
    lister: Box<dyn SourceLister>,
    existence: Box<dyn ExistenceQuery>,
    destination: Arc<DestinationClient>,
    pipeline: TransferPipeline,
    progress: MigrationProgress,
    cancel: CancellationToken,
}

impl Migrator {
    /// Create a migrator; fails before any network call on bad
    /// configuration or missing destination credentials.
    pub fn new(config: MigrationConfig, credentials: &dyn CredentialStore) -> Result<Self> {
        config.validate()?;

        let target = DestinationTarget::parse(&config.destination_url, config.repository_type)?;
        info!(host = %target.host, "Check authorization of the registry");
        let destination_credentials = credentials
            .get(&target.host)?
            .ok_or_else(|| MigrationError::NotAuthenticated(target.host.clone()))?;
        debug!(host = %target.host, username = %destination_credentials.username, "Found registry credentials");

        let client = build_http_client(config.request_timeout)?;
        let lister = lister_for(&config, client.clone())?;
        let upload_root = target.upload_root.clone();
        let destination = Arc::new(DestinationClient::new(
            client.clone(),
            target,
            destination_credentials.clone(),
        ));
        let existence = query_for(config.discipline(), destination.clone());
        let pipeline = TransferPipeline::new(
            client,
            config.source_root()?.to_string(),
            upload_root,
            config.source_credentials.clone(),
            destination_credentials,
        );

        Ok(Self {
            config,
            lister,
            existence,
            destination,
            pipeline,
            progress: MigrationProgress::new(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the source lister.
    pub fn with_lister(mut self, lister: Box<dyn SourceLister>) -> Self {
        self.lister = lister;
        self
    }

    /// Replace the destination existence query.
    pub fn with_existence_query(mut self, existence: Box<dyn ExistenceQuery>) -> Self {
        self.existence = existence;
        self
    }

    /// Set a progress tracker.
    pub fn with_progress(mut self, progress: MigrationProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Stop the run at the next item boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Run the migration.
    pub async fn migrate(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::new();
        info!(
            src = %self.config.source_url,
            src_type = %self.config.source_kind,
            dst = %self.config.destination_url,
            "Starting migration"
        );

        self.progress.set_phase(MigrationPhase::Listing, 0);
        info!(repository = %self.lister.repository(), "Get file list from source repository");
        let listed = match self.lister.list().await {
            Ok(listed) => listed,
            Err(e) => return Err(self.abort(e.into())),
        };
        report.listed = listed.len();

        let index = if self.config.force {
            info!("Force mode enabled, skipping destination existence check");
            None
        } else {
            self.progress.set_phase(MigrationPhase::Indexing, 0);
            match self.existence.build_index().await {
                Ok(index) => {
                    info!(existing = index.len(), "Indexed destination repository");
                    self.progress
                        .message(&format!("{} artifacts already at destination", index.len()));
                    Some(index)
                }
                Err(e) => return Err(self.abort(e.into())),
            }
        };

        self.progress
            .set_phase(MigrationPhase::Filtering, report.listed as u64);
        let filtered = filter_candidates(listed, self.config.prefix.as_deref(), index.as_ref());
        report.candidates = filtered.candidates.len();
        info!(
            file_count = filtered.matched,
            need_migrate_count = report.candidates,
            "Filtered source artifacts"
        );

        if filtered.candidates.is_empty() {
            if filtered.matched > 0 {
                info!("All artifacts have been migrated");
                report.complete(RunOutcome::NothingToMigrate);
                self.progress.set_phase(MigrationPhase::Done, 0);
                return Ok(report);
            }
            return Err(self.abort(MigrationError::ArtifactsNotFound(
                self.lister.repository().to_string(),
            )));
        }

        self.transfer_all(filtered.candidates, &mut report).await;
        Ok(report)
    }

    async fn transfer_all(&self, candidates: ArtifactSet, report: &mut MigrationReport) {
        self.progress
            .set_phase(MigrationPhase::Transferring, candidates.len() as u64);
        info!("Begin to migrate ...");
        let start = Instant::now();

        for artifact in &candidates {
            if self.cancel.is_cancelled() {
                warn!(processed = report.processed(), "Migration cancelled");
                self.finish(report, RunOutcome::Aborted("cancelled".to_string()));
                return;
            }

            let outcome = self.pipeline.transfer(artifact).await;
            self.progress.increment(Some(&artifact.source_path));

            match outcome {
                TransferOutcome::Succeeded => {
                    let message = self.attach_properties(artifact).await;
                    report.add_succeeded(artifact, message);
                }
                TransferOutcome::SkippedConflict => {
                    debug!(path = %artifact.source_path, "Destination already holds a non-overridable copy, skipping");
                    report.record(artifact, &TransferOutcome::SkippedConflict);
                }
                TransferOutcome::Failed(reason) => {
                    warn!(path = %artifact.source_path, reason = %reason, "Failed to migrate artifact");
                    report.add_failed(artifact, reason.as_str());
                    self.progress
                        .message(&format!("failed: {}", artifact.display_name));
                    if self.config.fail_fast {
                        let err = MigrationError::TransferFailed {
                            path: artifact.source_path.clone(),
                            reason,
                        };
                        self.finish(report, RunOutcome::Aborted(err.to_string()));
                        return;
                    }
                }
            }
        }

        info!(
            duration = ?start.elapsed(),
            succeeded_count = report.succeeded.len(),
            skipped_count = report.skipped.len(),
            failed_count = report.failed.len(),
            "End to migrate"
        );
        self.finish(report, RunOutcome::Migrated);
    }

    async fn attach_properties(&self, artifact: &ArtifactRef) -> String {
        if self.config.properties.is_empty() {
            return "Succeeded".to_string();
        }

        let (package, version) = artifact.package_and_version();
        match self
            .destination
            .add_properties(package, version, &self.config.properties)
            .await
        {
            Ok(()) => "Succeeded".to_string(),
            Err(e) => {
                warn!(path = %artifact.source_path, error = %e, "Failed to add artifact properties");
                format!("Succeeded (failed to add properties: {e})")
            }
        }
    }

    fn finish(&self, report: &mut MigrationReport, outcome: RunOutcome) {
        self.progress.set_phase(MigrationPhase::Reporting, 0);
        let terminal = match outcome {
            RunOutcome::Aborted(_) => MigrationPhase::Aborted,
            _ => MigrationPhase::Done,
        };
        report.complete(outcome);
        self.progress.set_phase(terminal, 0);
    }

    fn abort(&self, err: MigrationError) -> MigrationError {
        self.progress.set_phase(MigrationPhase::Aborted, 0);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{Credentials, MemoryCredentialStore};
    use crate::types::IndexDiscipline;

    fn set(paths: &[&str]) -> ArtifactSet {
        paths.iter().map(|p| ArtifactRef::new(*p)).collect()
    }

    #[test]
    fn test_filter_prefix_then_existence() {
        let index = ExistenceIndex::new(
            IndexDiscipline::Package,
            vec!["release/b.jar:latest".to_string()],
        );

        let filtered = filter_candidates(
            set(&["release/a.jar", "release/b.jar", "snapshot/c.jar"]),
            Some("/release/"),
            Some(&index),
        );

        assert_eq!(filtered.matched, 2);
        let paths: Vec<_> = filtered.candidates.iter().map(|a| a.source_path.as_str()).collect();
        assert_eq!(paths, vec!["release/a.jar"]);
    }

    #[test]
    fn test_filter_collapses_duplicate_paths() {
        let filtered = filter_candidates(set(&["a.jar", "b.jar", "a.jar"]), None, None);
        assert_eq!(filtered.matched, 3);
        assert_eq!(filtered.candidates.len(), 2);
    }

    #[test]
    fn test_filter_without_index_keeps_everything() {
        let filtered = filter_candidates(set(&["a.jar", "b.jar"]), Some(""), None);
        assert_eq!(filtered.candidates.len(), 2);
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let config = MigrationConfig::new(
            "http://nexus.local/repository/raw",
            "https://acme-generic.pkg.example.com/demo/files",
        );
        let err = Migrator::new(config, &MemoryCredentialStore::new()).err().unwrap();
        assert!(matches!(err, MigrationError::NotAuthenticated(host) if host == "acme-generic.pkg.example.com"));
    }

    #[test]
    fn test_invalid_destination_is_fatal() {
        let config = MigrationConfig::new("http://nexus.local/repository/raw", "https://dst/only");
        let store = MemoryCredentialStore::new().with_host("dst", Credentials::new("u", "p"));
        let err = Migrator::new(config, &store).err().unwrap();
        assert!(matches!(err, MigrationError::InvalidConfig(_)));
    }
}
