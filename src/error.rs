//! Error types with fix suggestions
//!
//! Error code ranges:
//! - AMS-010-019: Template errors (validation, resolution)
//! - AMS-020-029: Data source errors (manifest, locators)
//! - AMS-030-039: Upload errors
//! - AMS-040-049: Configuration / IO errors

use thiserror::Error;

use crate::field::ResourceKind;

pub type Result<T> = std::result::Result<T, MigrateError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum MigrateError {
    // ─────────────────────────────────────────────────────────────
    // Template errors (AMS-010 to AMS-012)
    // ─────────────────────────────────────────────────────────────
    #[error("[AMS-010] Unknown placeholder '${{{key}}}' in {kind} template")]
    InvalidTemplate { key: String, kind: ResourceKind },

    #[error("[AMS-011] No value found for '{field}' of {resource}")]
    ResolutionNotFound { field: String, resource: String },

    // ─────────────────────────────────────────────────────────────
    // Data source errors (AMS-020 to AMS-021)
    // ─────────────────────────────────────────────────────────────
    #[error("[AMS-020] Locator lookup failed: {reason}")]
    Locator { reason: String },

    #[error("[AMS-021] Failed to parse YAML: {0}")]
    ManifestParse(#[from] serde_yaml::Error),

    // ─────────────────────────────────────────────────────────────
    // Upload errors (AMS-030 to AMS-032)
    // ─────────────────────────────────────────────────────────────
    #[error("[AMS-030] Blob '{blob}' already exists in container '{container}'")]
    BlobExists { container: String, blob: String },

    #[error("[AMS-031] Upload of '{blob}' to container '{container}' failed: {reason}")]
    Upload {
        container: String,
        blob: String,
        reason: String,
    },

    #[error("[AMS-032] Operation cancelled")]
    Cancelled,

    // ─────────────────────────────────────────────────────────────
    // Configuration / IO errors (AMS-040 to AMS-041)
    // ─────────────────────────────────────────────────────────────
    #[error("[AMS-040] Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("[AMS-041] IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Stable error code (e.g. "AMS-010")
    pub fn code(&self) -> &'static str {
        match self {
            MigrateError::InvalidTemplate { .. } => "AMS-010",
            MigrateError::ResolutionNotFound { .. } => "AMS-011",
            MigrateError::Locator { .. } => "AMS-020",
            MigrateError::ManifestParse(_) => "AMS-021",
            MigrateError::BlobExists { .. } => "AMS-030",
            MigrateError::Upload { .. } => "AMS-031",
            MigrateError::Cancelled => "AMS-032",
            MigrateError::Config { .. } => "AMS-040",
            MigrateError::Io(_) => "AMS-041",
        }
    }
}

impl FixSuggestion for MigrateError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            MigrateError::InvalidTemplate { kind, .. } => Some(match kind {
                ResourceKind::Container => "Container templates only accept ${ContainerName}",
                ResourceKind::Asset => {
                    "Use ${AssetId}, ${AssetName}, ${AlternateId}, ${ContainerName} or ${StreamingUrl}"
                }
                ResourceKind::Key => "Key templates only accept ${KeyId} and ${PolicyName}",
            }),
            MigrateError::ResolutionNotFound { .. } => {
                Some("Create a streaming locator for the asset or drop ${StreamingUrl} from the template")
            }
            MigrateError::Locator { .. } => Some("Check the asset's streaming locators in the manifest"),
            MigrateError::ManifestParse(_) => Some("Check YAML syntax: indentation and quoting"),
            MigrateError::BlobExists { .. } => Some("Pass --overwrite to replace existing blobs"),
            MigrateError::Upload { .. } => Some("Check the storage root exists and is writable"),
            MigrateError::Cancelled => None,
            MigrateError::Config { .. } => Some("Check the config file and AMS_* environment variables"),
            MigrateError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
