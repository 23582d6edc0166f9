//! Carrier CLI - Command-line interface for artifact migration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use carrier_migrate::{MigrationConfig, RepositoryType, SourceKind, DEFAULT_PAGE_SIZE};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Carrier - Incremental artifact migration between registries
#[derive(Parser, Debug)]
#[command(name = "carrier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate artifacts from a source registry into a destination repository
    Migrate(MigrateArgs),

    /// Store credentials for a destination registry
    Login {
        /// Registry host or URL
        host: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },

    /// Remove stored credentials for a destination registry
    Logout {
        /// Registry host or URL
        host: String,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Source repository URL
    #[arg(long)]
    src: String,

    /// Destination repository URL
    #[arg(long)]
    dst: String,

    /// Source registry kind
    #[arg(long, value_enum, default_value_t = SourceKind::Nexus)]
    src_type: SourceKind,

    /// Destination repository type
    #[arg(long, value_enum, default_value_t = RepositoryType::Generic)]
    dst_type: RepositoryType,

    /// Source registry username
    #[arg(long)]
    src_username: Option<String>,

    /// Source registry password
    #[arg(long)]
    src_password: Option<String>,

    /// Only migrate artifacts whose path starts with this prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Transfer everything, without checking what the destination holds
    #[arg(long)]
    force: bool,

    /// Stop at the first failed artifact
    #[arg(long)]
    fail_fast: bool,

    /// Page size for numbered source listings
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u64,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Property attached to every uploaded artifact (repeatable)
    #[arg(long = "property", value_name = "NAME=VALUE", value_parser = commands::parse_property)]
    properties: Vec<(String, String)>,

    /// Write the report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

impl MigrateArgs {
    fn into_config(self) -> commands::Result<(MigrationConfig, Option<PathBuf>)> {
        let mut config = MigrationConfig::new(self.src, self.dst)
            .with_source_kind(self.src_type)
            .with_repository_type(self.dst_type)
            .with_force(self.force)
            .with_fail_fast(self.fail_fast)
            .with_page_size(self.page_size);

        if let Some(credentials) = commands::source_credentials(self.src_username, self.src_password)? {
            config = config.with_source_credentials(credentials);
        }
        if let Some(prefix) = self.prefix {
            config = config.with_prefix(prefix);
        }
        if let Some(secs) = self.timeout {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        for (name, value) in self.properties {
            config = config.with_property(name, value);
        }

        Ok((config, self.report))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("carrier={log_level},carrier_migrate={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Migrate(args) => {
            let (config, report_path) = args.into_config()?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, stopping after the current artifact");
                    on_interrupt.cancel();
                }
            });

            let report = commands::migrate(config, report_path.as_deref(), cancel)
                .await
                .context("migration failed")?;
            Ok(if report.is_aborted() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Login {
            host,
            username,
            password,
        } => {
            commands::login(&host, &username, &password)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Logout { host } => {
            commands::logout(&host)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("carrier {}", env!("CARGO_PKG_VERSION"));
            println!("carrier-migrate {}", carrier_migrate::VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}
