//! Migration configuration
//!
//! Loaded from a YAML file, then merged with environment variables.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Command line flags (applied by the binary)
//! 2. Environment variables (`AMS_STORAGE_ROOT`, `AMS_OVERWRITE`)
//! 3. Config file
//! 4. Defaults
//!
//! Templates are validated against their resource kind by
//! [`MigrationConfig::templates`], so a bad placeholder is reported before
//! any resource is touched.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::field::ResourceKind;
use crate::template::Template;

pub const ENV_STORAGE_ROOT: &str = "AMS_STORAGE_ROOT";
pub const ENV_OVERWRITE: &str = "AMS_OVERWRITE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationConfig {
    /// Asset template giving `<container>/<prefix>` for the asset's blobs
    pub path_template: String,

    /// Container template giving the target of a container copy
    pub container_template: String,

    /// Content key name template; the raw key id when unset
    pub key_template: Option<String>,

    pub key_uri_template: Option<String>,

    /// Root directory of the local blob store
    pub storage_root: PathBuf,

    /// Replace blobs that already exist instead of failing
    pub overwrite: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            path_template: "${ContainerName}".to_string(),
            container_template: "${ContainerName}".to_string(),
            key_template: None,
            key_uri_template: None,
            storage_root: PathBuf::from("storage"),
            overwrite: false,
        }
    }
}

/// The configured templates, each validated for its kind
#[derive(Debug, Clone)]
pub struct Templates {
    pub path: Template,
    pub container: Template,
    pub key: Option<Template>,
    pub key_uri: Option<Template>,
}

impl MigrationConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| MigrateError::Config {
            reason: format!("Failed to parse config: {}", e),
        })
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| MigrateError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    /// Merge with process environment variables
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|name| std::env::var(name).ok())
    }

    /// Merge with variables from `lookup`; empty values are ignored
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(root) = var(ENV_STORAGE_ROOT) {
            self.storage_root = PathBuf::from(root);
        }

        if let Some(flag) = var(ENV_OVERWRITE) {
            self.overwrite = parse_flag(&flag).ok_or_else(|| MigrateError::Config {
                reason: format!("{}='{}' is not a boolean", ENV_OVERWRITE, flag),
            })?;
        }

        Ok(self)
    }

    /// Validate every template against its resource kind
    pub fn templates(&self) -> Result<Templates> {
        let optional = |template: &Option<String>| {
            template
                .as_deref()
                .map(|t| Template::new(t, ResourceKind::Key))
                .transpose()
        };

        Ok(Templates {
            path: Template::new(&self.path_template, ResourceKind::Asset)?,
            container: Template::new(&self.container_template, ResourceKind::Container)?,
            key: optional(&self.key_template)?,
            key_uri: optional(&self.key_uri_template)?,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
