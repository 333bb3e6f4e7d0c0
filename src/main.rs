//! ams-migrate CLI - map media assets into blob storage

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use ams_migrate::migrate::UnitReport;
use ams_migrate::{
    validate, FixSuggestion, LocalBlobStore, Manifest, MigrateError, MigrationConfig,
    MigrationReport, Migrator, ResourceKind,
};

#[derive(Parser)]
#[command(name = "ams-migrate")]
#[command(about = "Map media assets, containers and content keys into blob storage")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG still applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a template's placeholders against a resource kind
    Validate {
        /// Resource kind (container, asset, key)
        #[arg(short, long, default_value = "asset")]
        kind: ResourceKind,

        /// Template, e.g. "${AssetName}/${AssetId}"
        template: String,
    },

    /// Print the names each unit of a manifest maps to
    Expand {
        /// Path to the manifest YAML
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to the config YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload the manifest's assets into the local blob store
    Migrate {
        /// Path to the manifest YAML
        #[arg(short, long)]
        manifest: PathBuf,

        /// Path to the config YAML
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the storage root directory
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Replace blobs that already exist
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate { kind, template } => validate_template(kind, &template),
        Commands::Expand {
            manifest,
            config,
            json,
        } => expand(&manifest, config.as_deref(), json).await,
        Commands::Migrate {
            manifest,
            config,
            storage_root,
            overwrite,
        } => migrate(&manifest, config.as_deref(), storage_root, overwrite).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            if let Some(suggestion) = e
                .downcast_ref::<MigrateError>()
                .and_then(|err| err.fix_suggestion())
            {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

/// Returns Ok(false) when the template is invalid
fn validate_template(kind: ResourceKind, template: &str) -> Result<bool> {
    match validate(template, kind) {
        Ok(()) => {
            println!("{} {} template is valid", "✓".green(), kind);
            Ok(true)
        }
        Err(err) => {
            println!("{} {}", "✗".red(), err);
            if let Some(suggestion) = err.fix_suggestion() {
                println!("  {} {}", "Fix:".yellow(), suggestion);
            }
            Ok(false)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    let config = match path {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    Ok(config.with_env()?)
}

async fn load_manifest(path: &Path) -> Result<Manifest> {
    Manifest::load(path)
        .await
        .with_context(|| format!("Failed to load manifest {}", path.display()))
}

fn source_root(manifest: &Path) -> PathBuf {
    manifest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn expand(manifest_path: &Path, config: Option<&Path>, json: bool) -> Result<bool> {
    let config = load_config(config)?;
    let templates = config.templates()?;
    let manifest = load_manifest(manifest_path).await?;

    let store = LocalBlobStore::new(&config.storage_root);
    let migrator =
        Migrator::new(templates, Arc::new(store)).with_source_root(source_root(manifest_path));
    let report = migrator.plan(&manifest).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.failed() == 0)
}

async fn migrate(
    manifest_path: &Path,
    config: Option<&Path>,
    storage_root: Option<PathBuf>,
    overwrite: bool,
) -> Result<bool> {
    let mut config = load_config(config)?;
    if let Some(root) = storage_root {
        config.storage_root = root;
    }
    config.overwrite |= overwrite;

    let templates = config.templates()?;
    let manifest = load_manifest(manifest_path).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!(
        "{} Migrating into {}{}",
        "→".cyan(),
        config.storage_root.display().to_string().cyan().bold(),
        if config.overwrite { " (overwrite)" } else { "" }
    );

    let store = LocalBlobStore::new(&config.storage_root).with_overwrite(config.overwrite);
    let migrator = Migrator::new(templates, Arc::new(store))
        .with_source_root(source_root(manifest_path))
        .with_cancellation(cancel);
    let report = migrator.run(&manifest).await;

    print_report(&report);
    Ok(report.failed() == 0 && !report.cancelled)
}

fn print_report(report: &MigrationReport) {
    print_section("Containers", &report.containers, |copy| {
        format!("{} ({} blobs)", copy.location, copy.blobs)
    });
    print_section("Assets", &report.assets, |upload| {
        format!(
            "{} ({} blobs, {} bytes)",
            upload.location,
            upload.blobs.len(),
            upload.bytes
        )
    });
    print_section("Keys", &report.keys, |key| match &key.uri {
        Some(uri) => format!("{} ({})", key.name, uri),
        None => key.name.clone(),
    });

    let summary = format!("{} migrated, {} failed", report.succeeded(), report.failed());
    if report.failed() == 0 {
        println!("{} {}", "✓".green(), summary);
    } else {
        println!("{} {}", "✗".red(), summary);
    }
    if report.cancelled {
        println!("{} cancelled, remaining units skipped", "!".yellow());
    }
}

fn print_section<T>(title: &str, units: &[UnitReport<T>], describe: impl Fn(&T) -> String) {
    if units.is_empty() {
        return;
    }
    println!("{}", format!("{}:", title).cyan().bold());
    for unit in units {
        match (&unit.target, &unit.error) {
            (Some(target), _) => println!("  {} {} → {}", "✓".green(), unit.unit, describe(target)),
            (None, Some(error)) => println!("  {} {}: {}", "✗".red(), unit.unit, error),
            (None, None) => {}
        }
    }
}
