//! Per-run ledger of transfer outcomes.

use crate::transfer::TransferOutcome;
use crate::types::ArtifactRef;

use chrono::{DateTime, Utc};
use console::style;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub display_name: String,
    pub source_path: String,
    pub message: String,
}

/// How a run that got past listing ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The transfer loop ran over the whole candidate set.
    Migrated,
    /// Every listed artifact already exists at the destination.
    NothingToMigrate,
    /// The run stopped early; the lists hold what was attempted.
    Aborted(String),
}

/// Report of a migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Artifacts produced by the source listing.
    pub listed: usize,

    /// Artifacts left after prefix and existence filtering.
    pub candidates: usize,

    pub succeeded: Vec<ReportEntry>,
    pub skipped: Vec<ReportEntry>,
    pub failed: Vec<ReportEntry>,

    /// How the run ended; `None` while it is still running.
    pub outcome: Option<RunOutcome>,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MigrationReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn add_succeeded(&mut self, artifact: &ArtifactRef, message: impl Into<String>) {
        self.succeeded.push(entry(artifact, message));
    }

    pub fn add_skipped(&mut self, artifact: &ArtifactRef, message: impl Into<String>) {
        self.skipped.push(entry(artifact, message));
    }

    pub fn add_failed(&mut self, artifact: &ArtifactRef, message: impl Into<String>) {
        self.failed.push(entry(artifact, message));
    }

    /// Append the outcome of one transfer to the matching list.
    pub fn record(&mut self, artifact: &ArtifactRef, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Succeeded => self.add_succeeded(artifact, "Succeeded"),
            TransferOutcome::SkippedConflict => self.add_skipped(artifact, "409 Conflict"),
            TransferOutcome::Failed(reason) => self.add_failed(artifact, reason.as_str()),
        }
    }

    /// Mark the run as finished.
    pub fn complete(&mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
        self.completed_at = Some(Utc::now());
    }

    /// Items with a recorded outcome.
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    /// Whether the run finished without being aborted.
    pub fn is_successful(&self) -> bool {
        matches!(
            self.outcome,
            Some(RunOutcome::Migrated) | Some(RunOutcome::NothingToMigrate)
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, Some(RunOutcome::Aborted(_)))
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Get the duration of the run.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Render the three lists, counts and elapsed time.
    pub fn render<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "\n=== Migration Summary ===\n")?;

        render_section(out, &style("Succeeded").green().to_string(), &self.succeeded)?;
        render_section(out, &style("Skipped").yellow().to_string(), &self.skipped)?;
        render_section(out, &style("Failed").red().to_string(), &self.failed)?;

        writeln!(
            out,
            "Listed: {}  Candidates: {}  Succeeded: {}  Skipped: {}  Failed: {}",
            self.listed,
            self.candidates,
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        )?;

        if let Some(duration) = self.duration() {
            writeln!(
                out,
                "Completed in {:.3} seconds",
                duration.num_milliseconds() as f64 / 1000.0
            )?;
        }

        let status = match &self.outcome {
            Some(RunOutcome::Migrated) if self.has_failures() => {
                "COMPLETED WITH FAILURES".to_string()
            }
            Some(RunOutcome::Migrated) => "SUCCESS".to_string(),
            Some(RunOutcome::NothingToMigrate) => "NOTHING TO MIGRATE".to_string(),
            Some(RunOutcome::Aborted(reason)) => format!("ABORTED ({reason})"),
            None => "RUNNING".to_string(),
        };
        writeln!(out, "\nOverall Status: {status}")
    }

    /// Print the summary to stdout.
    pub fn print_summary(&self) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.render(&mut out)?;
        out.flush()
    }
}

fn entry(artifact: &ArtifactRef, message: impl Into<String>) -> ReportEntry {
    ReportEntry {
        display_name: artifact.display_name.clone(),
        source_path: artifact.source_path.clone(),
        message: message.into(),
    }
}

fn render_section<W: Write>(out: &mut W, title: &str, entries: &[ReportEntry]) -> std::io::Result<()> {
    writeln!(out, "{title} ({}):", entries.len())?;
    for e in entries {
        writeln!(out, "  {}\t{}\t{}", e.display_name, e.source_path, e.message)?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_partitions_outcomes() {
        let mut report = MigrationReport::new();
        report.record(&ArtifactRef::new("a.jar"), &TransferOutcome::Succeeded);
        report.record(&ArtifactRef::new("c.jar"), &TransferOutcome::SkippedConflict);
        report.record(
            &ArtifactRef::new("d.jar"),
            &TransferOutcome::Failed("got an unexpected response status: 500".to_string()),
        );

        assert_eq!(report.succeeded[0].source_path, "a.jar");
        assert_eq!(report.skipped[0].message, "409 Conflict");
        assert!(report.failed[0].message.contains("500"));
        assert_eq!(report.processed(), 3);
    }

    #[test]
    fn test_outcome_drives_success() {
        let mut report = MigrationReport::new();
        assert!(!report.is_successful());

        report.complete(RunOutcome::Aborted("failed to migrate x".to_string()));
        assert!(report.is_aborted());
        assert!(!report.is_successful());

        report.complete(RunOutcome::NothingToMigrate);
        assert!(report.is_successful());
        assert!(report.duration().is_some());
    }

    #[test]
    fn test_render_lists_entries_and_counts() {
        let mut report = MigrationReport::new();
        report.listed = 3;
        report.candidates = 2;
        report.record(&ArtifactRef::new("libs/a.jar"), &TransferOutcome::Succeeded);
        report.record(&ArtifactRef::new("libs/c.jar"), &TransferOutcome::SkippedConflict);
        report.complete(RunOutcome::Migrated);

        let mut out = Vec::new();
        report.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("libs/a.jar"));
        assert!(text.contains("409 Conflict"));
        assert!(text.contains("Listed: 3  Candidates: 2  Succeeded: 1  Skipped: 1  Failed: 0"));
        assert!(text.contains("Overall Status: SUCCESS"));
        assert!(text.contains("Completed in"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_render_surfaces_write_errors() {
        let mut report = MigrationReport::new();
        report.complete(RunOutcome::NothingToMigrate);

        let err = report.render(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_report_serializes_outcome() {
        let mut report = MigrationReport::new();
        report.complete(RunOutcome::Aborted("cancelled".to_string()));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "aborted");
        assert_eq!(json["outcome"]["reason"], "cancelled");
    }
}
