//! Per-kind value resolvers
//!
//! A resolver maps a placeholder key to the value it stands for on one
//! resource instance. `Ok(None)` means the key does not apply and the
//! placeholder is left in place. Lookups may await (streaming locators)
//! and may fail, which aborts the surrounding expansion.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{MigrateError, Result};
use crate::field::{AssetField, ContainerField, KeyField};
use crate::source::{Asset, Container, ContentKey, LocatorClient};

#[async_trait]
pub trait ValueResolver: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<Option<String>>;
}

/// Resolves `${ContainerName}` against a storage container
pub struct ContainerResolver<'a> {
    container: &'a Container,
}

impl<'a> ContainerResolver<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }
}

#[async_trait]
impl<'a> ValueResolver for ContainerResolver<'a> {
    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        Ok(match ContainerField::parse(key) {
            Some(ContainerField::ContainerName) => Some(self.container.name.clone()),
            None => None,
        })
    }
}

/// Resolves asset fields, including the locator-backed `${StreamingUrl}`
pub struct AssetResolver<'a> {
    asset: &'a Asset,
    locators: &'a dyn LocatorClient,
}

impl<'a> AssetResolver<'a> {
    pub fn new(asset: &'a Asset, locators: &'a dyn LocatorClient) -> Self {
        Self { asset, locators }
    }

    /// First path of the first locator that publishes any path
    async fn streaming_url(&self) -> Result<String> {
        let mut locators = self.locators.streaming_locators(self.asset);
        while let Some(locator) = locators.next().await {
            let locator = locator?;
            let paths = self.locators.streaming_paths(&locator).await?;
            if let Some(path) = paths.into_iter().next() {
                debug!(
                    asset = %self.asset.name,
                    locator = %locator.name,
                    path = %path,
                    "resolved streaming url"
                );
                return Ok(path);
            }
        }

        error!(
            asset = %self.asset.name,
            "no streaming locator with a streaming path; StreamingUrl was used in template"
        );
        Err(MigrateError::ResolutionNotFound {
            field: AssetField::StreamingUrl.name().to_string(),
            resource: format!("asset '{}'", self.asset.name),
        })
    }
}

#[async_trait]
impl<'a> ValueResolver for AssetResolver<'a> {
    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        let Some(field) = AssetField::parse(key) else {
            return Ok(None);
        };
        let asset = self.asset;
        Ok(match field {
            AssetField::AssetId => Some(asset.id.unwrap_or(Uuid::nil()).to_string()),
            AssetField::AssetName => Some(asset.name.clone()),
            AssetField::ContainerName => asset.container.clone(),
            AssetField::AlternateId => Some(
                asset
                    .alternate_id
                    .clone()
                    .unwrap_or_else(|| asset.name.clone()),
            ),
            AssetField::StreamingUrl => Some(self.streaming_url().await?),
        })
    }
}

/// Resolves content key fields
pub struct KeyResolver<'a> {
    key: &'a ContentKey,
}

impl<'a> KeyResolver<'a> {
    pub fn new(key: &'a ContentKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl<'a> ValueResolver for KeyResolver<'a> {
    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        Ok(match KeyField::parse(key) {
            Some(KeyField::KeyId) => Some(self.key.id.to_string()),
            Some(KeyField::PolicyName) => self.key.policy_name.clone(),
            None => None,
        })
    }
}

/// Resolves only `${KeyId}`, for key URI templates
pub struct KeyUriResolver<'a> {
    key_id: &'a str,
}

impl<'a> KeyUriResolver<'a> {
    pub fn new(key_id: &'a str) -> Self {
        Self { key_id }
    }
}

#[async_trait]
impl<'a> ValueResolver for KeyUriResolver<'a> {
    async fn resolve(&self, key: &str) -> Result<Option<String>> {
        Ok(match KeyField::parse(key) {
            Some(KeyField::KeyId) => Some(self.key_id.to_string()),
            Some(KeyField::PolicyName) | None => None,
        })
    }
}
