//! Template expansion for storage names
//!
//! Templates contain `${Key}` placeholders, where `Key` is `[A-Za-z0-9_]+`
//! and is matched case-insensitively against the fields of a
//! [`ResourceKind`]. Expansion:
//! - scans placeholders once per template string and caches the scan
//! - resolves them right-to-left, so earlier byte ranges stay valid while
//!   later ones are replaced with values of a different length
//! - awaits each resolution in turn; a failed lookup aborts the expansion
//! - sanitizes the result into a legal resource name
//!
//! Expanded values are never cached: resolvers may answer differently
//! from one call to the next.

use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::error::{MigrateError, Result};
use crate::field::ResourceKind;
use crate::path::{split_path, ContainerPrefix};
use crate::resolver::{
    AssetResolver, ContainerResolver, KeyResolver, KeyUriResolver, ValueResolver,
};
use crate::sanitize::sanitize_resource_name;
use crate::source::{Asset, Container, ContentKey, LocatorClient};

/// Pre-compiled regex for `${Key}` placeholders
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(?P<key>[A-Za-z0-9_]+)\}").unwrap());

/// A `${Key}` occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub key: String,
    /// Byte range of the whole `${Key}` token
    pub range: Range<usize>,
}

/// All placeholders of a template, in textual order
pub fn placeholders(template: &str) -> Vec<Placeholder> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(Placeholder {
                key: cap["key"].to_string(),
                range: whole.range(),
            })
        })
        .collect()
}

/// First placeholder key that `kind` does not accept
pub fn first_unknown_key(template: &str, kind: ResourceKind) -> Option<String> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .map(|cap| cap["key"].to_string())
        .find(|key| !kind.accepts(key))
}

/// Check that every placeholder of `template` is a field of `kind`.
///
/// Run this when templates are loaded, before any resource is touched.
///
/// ```
/// use ams_migrate::field::ResourceKind;
/// use ams_migrate::template::validate;
///
/// assert!(validate("${AssetName}/${ContainerName}", ResourceKind::Asset).is_ok());
/// assert!(validate("${PolicyName}", ResourceKind::Asset).is_err());
/// ```
pub fn validate(template: &str, kind: ResourceKind) -> Result<()> {
    match first_unknown_key(template, kind) {
        Some(key) => Err(MigrateError::InvalidTemplate { key, kind }),
        None => Ok(()),
    }
}

/// A template validated for one resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    kind: ResourceKind,
}

impl Template {
    pub fn new(source: impl Into<String>, kind: ResourceKind) -> Result<Self> {
        let source = source.into();
        validate(&source, kind)?;
        Ok(Self { source, kind })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Deref for Template {
    type Target = str;

    fn deref(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Expands templates into sanitized names and container/prefix pairs
pub struct TemplateMapper {
    /// Placeholder scans keyed by template text
    cache: DashMap<String, Arc<[Placeholder]>>,
}

impl Default for TemplateMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateMapper {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
        }
    }

    /// Placeholder scan of `template` (with caching).
    ///
    /// The cache is unbounded and keyed by template text. It is meant for
    /// the handful of configured templates; callers expanding ad-hoc
    /// templates should use a short-lived mapper.
    pub fn scan(&self, template: &str) -> Arc<[Placeholder]> {
        if let Some(cached) = self.cache.get(template) {
            return Arc::clone(&cached);
        }

        let scanned: Arc<[Placeholder]> = placeholders(template).into();
        self.cache.insert(template.to_string(), Arc::clone(&scanned));
        scanned
    }

    /// Substitute every placeholder, then sanitize.
    ///
    /// Placeholders the resolver reports as absent stay in the text.
    pub async fn expand_template<R>(&self, template: &str, resolver: &R) -> Result<String>
    where
        R: ValueResolver + ?Sized,
    {
        let scanned = self.scan(template);
        let mut expanded = template.to_string();

        for placeholder in scanned.iter().rev() {
            if let Some(value) = resolver.resolve(&placeholder.key).await? {
                expanded.replace_range(placeholder.range.clone(), &value);
            }
        }

        trace!(template, expanded = %expanded, "template expanded");
        Ok(sanitize_resource_name(&expanded))
    }

    /// Expand, then split into container and blob prefix
    pub async fn expand_path_template<R>(
        &self,
        template: &str,
        resolver: &R,
    ) -> Result<ContainerPrefix>
    where
        R: ValueResolver + ?Sized,
    {
        let expanded = self.expand_template(template, resolver).await?;
        Ok(split_path(&expanded))
    }

    pub async fn expand_asset_template(
        &self,
        asset: &Asset,
        locators: &dyn LocatorClient,
        template: &str,
    ) -> Result<ContainerPrefix> {
        let resolver = AssetResolver::new(asset, locators);
        self.expand_path_template(template, &resolver).await
    }

    pub async fn expand_container_template(
        &self,
        container: &Container,
        template: &str,
    ) -> Result<ContainerPrefix> {
        let resolver = ContainerResolver::new(container);
        self.expand_path_template(template, &resolver).await
    }

    /// Name for a content key; without a template the raw key id is used
    pub async fn expand_key_template(
        &self,
        key: &ContentKey,
        template: Option<&str>,
    ) -> Result<String> {
        match template {
            None => Ok(key.id.to_string()),
            Some(template) => {
                let resolver = KeyResolver::new(key);
                self.expand_template(template, &resolver).await
            }
        }
    }

    pub async fn expand_key_uri_template(&self, uri_template: &str, key_id: &str) -> Result<String> {
        let resolver = KeyUriResolver::new(key_id);
        self.expand_template(uri_template, &resolver).await
    }
}
