//! CLI command implementations.

use carrier_migrate::{
    ConsoleProgressReporter, CredentialError, Credentials, FileCredentialStore, MigrationConfig,
    MigrationError, MigrationProgress, MigrationReport, Migrator,
};
use std::path::Path;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Parse a `NAME=VALUE` property argument.
pub fn parse_property(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

/// Reduce a host argument to the key registry credentials are looked up by.
/// Accepts bare hosts and full URLs.
pub fn normalize_host(raw: &str) -> Result<String> {
    Ok(carrier_migrate::registry_host(raw)?)
}

/// Pair the source username and password, which must be given together.
pub fn source_credentials(
    username: Option<String>,
    password: Option<String>,
) -> Result<Option<Credentials>> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(Credentials::new(username, password))),
        (None, None) => Ok(None),
        _ => Err(CliError::InvalidArgument(
            "--src-username and --src-password must be given together".to_string(),
        )),
    }
}

/// Run a migration, render the summary and optionally write a JSON report.
pub async fn migrate(
    config: MigrationConfig,
    report_path: Option<&Path>,
    cancel: CancellationToken,
) -> Result<MigrationReport> {
    let store = FileCredentialStore::default_location()?;

    let reporter = ConsoleProgressReporter::new();
    let migrator = Migrator::new(config, &store)?
        .with_progress(MigrationProgress::with_callback(reporter.callback()))
        .with_cancellation(cancel);

    let result = migrator.migrate().await;
    reporter.finish("Done");
    let report = result?;

    report.print_summary()?;

    if let Some(path) = report_path {
        write_report(&report, path)?;
        println!("Report written to {}", path.display());
    }

    Ok(report)
}

/// Write the report as pretty-printed JSON.
pub fn write_report(report: &MigrationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Store registry credentials.
pub fn login(host: &str, username: &str, password: &str) -> Result<()> {
    let host = normalize_host(host)?;
    let store = FileCredentialStore::default_location()?;
    store.login(&host, Credentials::new(username, password))?;

    println!("Logged in to {host} as {username}");
    println!("Credentials saved to {}", store.path().display());
    Ok(())
}

/// Remove stored registry credentials.
pub fn logout(host: &str) -> Result<()> {
    let host = normalize_host(host)?;
    let store = FileCredentialStore::default_location()?;
    store.logout(&host)?;

    println!("Logged out of {host}");
    Ok(())
}
