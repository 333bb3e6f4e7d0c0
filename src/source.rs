//! Asset, container and content key records, plus the manifest data source
//!
//! The resolvers only see plain records. The one lookup that needs I/O,
//! enumerating an asset's streaming locators, goes through
//! [`LocatorClient`] so it can be backed by a remote service.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// A media asset as seen by the template engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub alternate_id: Option<String>,
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            container: None,
            alternate_id: None,
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_alternate_id(mut self, alternate_id: impl Into<String>) -> Self {
        self.alternate_id = Some(alternate_id.into());
        self
    }
}

/// A storage container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
}

/// A content key attached to a streaming locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey {
    pub id: Uuid,
    #[serde(default)]
    pub policy_name: Option<String>,
}

/// A streaming locator and the paths it publishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingLocator {
    pub name: String,
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Capability to look up an asset's streaming locators.
///
/// `streaming_locators` yields a lazy, finite stream that is consumed at
/// most once per lookup.
#[async_trait]
pub trait LocatorClient: Send + Sync {
    fn streaming_locators<'a>(&'a self, asset: &'a Asset)
        -> BoxStream<'a, Result<StreamingLocator>>;

    async fn streaming_paths(&self, locator: &StreamingLocator) -> Result<Vec<String>>;
}

/// One asset entry of a manifest: the record plus migration inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetEntry {
    #[serde(flatten)]
    pub asset: Asset,

    /// Local files or directories holding the asset's content
    #[serde(default)]
    pub files: Vec<PathBuf>,

    #[serde(default)]
    pub locators: Vec<StreamingLocator>,
}

/// YAML description of the resources to migrate
///
/// ```yaml
/// containers:
///   - name: asset-1234
/// assets:
///   - name: My Video
///     container: asset-1234
///     files: [./media/my-video]
///     locators:
///       - name: default
///         paths: [/my-video/manifest.m3u8]
/// keys:
///   - id: 6c2fd6a9-1f23-4bd4-9f4f-0b8f6a1b2c3d
///     policy_name: drm-policy
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub keys: Vec<ContentKey>,
}

impl Manifest {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let yaml = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&yaml)
    }

    pub fn asset(&self, name: &str) -> Option<&AssetEntry> {
        self.assets.iter().find(|entry| entry.asset.name == name)
    }
}

#[async_trait]
impl LocatorClient for Manifest {
    fn streaming_locators<'a>(
        &'a self,
        asset: &'a Asset,
    ) -> BoxStream<'a, Result<StreamingLocator>> {
        let locators = self
            .asset(&asset.name)
            .map(|entry| entry.locators.as_slice())
            .unwrap_or_default();
        debug!(asset = %asset.name, count = locators.len(), "listing streaming locators");
        stream::iter(locators.iter().cloned().map(Ok)).boxed()
    }

    async fn streaming_paths(&self, locator: &StreamingLocator) -> Result<Vec<String>> {
        Ok(locator.paths.clone())
    }
}
