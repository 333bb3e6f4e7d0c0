//! Per-unit migration
//!
//! Each container, asset and content key is one unit. A unit that fails
//! (bad locator, existing blob, missing file) is recorded in the report
//! and the batch moves on. Cancellation stops the batch between units.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Templates;
use crate::error::{MigrateError, Result};
use crate::path::ContainerPrefix;
use crate::source::{AssetEntry, Container, ContentKey, LocatorClient, Manifest};
use crate::template::TemplateMapper;
use crate::upload::{to_blob_name, BlobLocation, Uploader};

/// Outcome of one migration unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport<T> {
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> UnitReport<T> {
    fn from_result(unit: impl Into<String>, result: Result<T>) -> Self {
        let unit = unit.into();
        match result {
            Ok(target) => Self {
                unit,
                target: Some(target),
                error: None,
            },
            Err(e) => Self {
                unit,
                target: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Where an asset's content went
#[derive(Debug, Clone, Serialize)]
pub struct AssetUpload {
    #[serde(flatten)]
    pub location: ContainerPrefix,
    pub blobs: Vec<String>,
    pub bytes: u64,
}

/// Where a container's blobs went
#[derive(Debug, Clone, Serialize)]
pub struct ContainerCopy {
    #[serde(flatten)]
    pub location: ContainerPrefix,
    pub blobs: usize,
}

/// Name (and optional URI) a content key maps to
#[derive(Debug, Clone, Serialize)]
pub struct KeyMapping {
    pub key_id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub containers: Vec<UnitReport<ContainerCopy>>,
    pub assets: Vec<UnitReport<AssetUpload>>,
    pub keys: Vec<UnitReport<KeyMapping>>,
    pub cancelled: bool,
}

impl MigrationReport {
    pub fn failed(&self) -> usize {
        self.containers.iter().filter(|r| !r.is_ok()).count()
            + self.assets.iter().filter(|r| !r.is_ok()).count()
            + self.keys.iter().filter(|r| !r.is_ok()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.containers.len() + self.assets.len() + self.keys.len() - self.failed()
    }
}

pub struct Migrator {
    mapper: TemplateMapper,
    templates: Templates,
    uploader: Arc<dyn Uploader>,
    source_root: PathBuf,
    cancel: CancellationToken,
}

impl Migrator {
    pub fn new(templates: Templates, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            mapper: TemplateMapper::new(),
            templates,
            uploader,
            source_root: PathBuf::from("."),
            cancel: CancellationToken::new(),
        }
    }

    /// Directory that relative asset file paths are resolved against
    pub fn with_source_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.source_root = root.into();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Expand every unit's names without writing anything
    pub async fn plan(&self, manifest: &Manifest) -> MigrationReport {
        self.execute(manifest, true).await
    }

    /// Migrate every unit of the manifest
    pub async fn run(&self, manifest: &Manifest) -> MigrationReport {
        self.execute(manifest, false).await
    }

    async fn execute(&self, manifest: &Manifest, dry_run: bool) -> MigrationReport {
        let mut report = MigrationReport::default();

        for container in &manifest.containers {
            if self.stop_requested(&mut report) {
                return report;
            }
            let result = self.migrate_container(container, dry_run).await;
            report
                .containers
                .push(self.record(&container.name, result));
        }

        for entry in &manifest.assets {
            if self.stop_requested(&mut report) {
                return report;
            }
            let result = self.migrate_asset(entry, manifest, dry_run).await;
            report.assets.push(self.record(&entry.asset.name, result));
        }

        for key in &manifest.keys {
            if self.stop_requested(&mut report) {
                return report;
            }
            let result = self.map_key(key).await;
            report.keys.push(self.record(key.id.to_string(), result));
        }

        report
    }

    fn stop_requested(&self, report: &mut MigrationReport) -> bool {
        if self.cancel.is_cancelled() {
            warn!("migration cancelled; remaining units skipped");
            report.cancelled = true;
        }
        report.cancelled
    }

    fn record<T>(&self, unit: impl Into<String>, result: Result<T>) -> UnitReport<T> {
        let unit = unit.into();
        match &result {
            Ok(_) => info!(unit = %unit, "migrated"),
            Err(MigrateError::Cancelled) => warn!(unit = %unit, "cancelled"),
            Err(e) => warn!(unit = %unit, code = e.code(), error = %e, "migration failed"),
        }
        UnitReport::from_result(unit, result)
    }

    async fn migrate_container(&self, container: &Container, dry_run: bool) -> Result<ContainerCopy> {
        let location = self
            .mapper
            .expand_container_template(container, &self.templates.container)
            .await?;

        if location.container == container.name && location.prefix.is_empty() {
            debug!(container = %container.name, "container already in place");
            return Ok(ContainerCopy { location, blobs: 0 });
        }

        let blobs = self.uploader.list_blobs(&container.name).await?;
        if !dry_run {
            for blob in &blobs {
                let source = BlobLocation {
                    container: container.name.clone(),
                    blob: blob.clone(),
                };
                self.uploader
                    .copy_blob(&location.container, &location.blob_name(blob), &source, &self.cancel)
                    .await?;
            }
        }

        Ok(ContainerCopy {
            blobs: blobs.len(),
            location,
        })
    }

    async fn migrate_asset(
        &self,
        entry: &AssetEntry,
        locators: &dyn LocatorClient,
        dry_run: bool,
    ) -> Result<AssetUpload> {
        let location = self
            .mapper
            .expand_asset_template(&entry.asset, locators, &self.templates.path)
            .await?;

        let files = collect_files(self.source_root.clone(), entry.files.clone()).await?;
        let mut upload = AssetUpload {
            location,
            blobs: Vec::with_capacity(files.len()),
            bytes: 0,
        };

        for (path, relative) in files {
            let blob = upload.location.blob_name(&relative);
            if !dry_run {
                let mut file = tokio::fs::File::open(&path).await?;
                let progress = |bytes: u64| trace!(blob = %relative, bytes, "upload progress");
                let written = self
                    .uploader
                    .upload(&upload.location.container, &blob, &mut file, &progress, &self.cancel)
                    .await?;
                upload.bytes += written;
            }
            upload.blobs.push(blob);
        }

        Ok(upload)
    }

    async fn map_key(&self, key: &ContentKey) -> Result<KeyMapping> {
        let name = self
            .mapper
            .expand_key_template(key, self.templates.key.as_deref())
            .await?;

        let uri = match &self.templates.key_uri {
            Some(template) => Some(
                self.mapper
                    .expand_key_uri_template(template, &key.id.to_string())
                    .await?,
            ),
            None => None,
        };

        Ok(KeyMapping {
            key_id: key.id,
            name,
            uri,
        })
    }
}

/// Expand files and directories into `(path, blob-relative name)` pairs
async fn collect_files(root: PathBuf, inputs: Vec<PathBuf>) -> Result<Vec<(PathBuf, String)>> {
    tokio::task::spawn_blocking(move || walk_inputs(&root, &inputs))
        .await
        .map_err(|e| MigrateError::Io(std::io::Error::other(e)))?
}

fn walk_inputs(root: &Path, inputs: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = root.join(input);
        let metadata = std::fs::metadata(&path)?;

        if metadata.is_file() {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            files.push((path, name));
            continue;
        }

        for entry in WalkDir::new(&path).sort_by_file_name() {
            let entry = entry.map_err(|e| MigrateError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&path) {
                files.push((entry.path().to_path_buf(), to_blob_name(relative)));
            }
        }
    }
    Ok(files)
}
