//! Resource kinds and the placeholder fields each kind accepts
//!
//! Field names are a closed set per kind. A template for kind `K` may only
//! reference names listed in [`ResourceKind::field_names`]; lookups are
//! ASCII case-insensitive, matching the placeholder grammar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification controlling which placeholder keys are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Container,
    Asset,
    Key,
}

const CONTAINER_FIELDS: &[&str] = &["ContainerName"];

const ASSET_FIELDS: &[&str] = &[
    "AssetId",
    "AssetName",
    "AlternateId",
    "ContainerName",
    "StreamingUrl",
];

const KEY_FIELDS: &[&str] = &["KeyId", "PolicyName"];

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Container,
        ResourceKind::Asset,
        ResourceKind::Key,
    ];

    /// Ordered set of field names legal in a template of this kind
    pub const fn field_names(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Container => CONTAINER_FIELDS,
            ResourceKind::Asset => ASSET_FIELDS,
            ResourceKind::Key => KEY_FIELDS,
        }
    }

    /// Look up a placeholder key for this kind
    pub fn field(self, key: &str) -> Option<Field> {
        match self {
            ResourceKind::Container => ContainerField::parse(key).map(Field::Container),
            ResourceKind::Asset => AssetField::parse(key).map(Field::Asset),
            ResourceKind::Key => KeyField::parse(key).map(Field::Key),
        }
    }

    pub fn accepts(self, key: &str) -> bool {
        self.field(key).is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Container => "container",
            ResourceKind::Asset => "asset",
            ResourceKind::Key => "key",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown resource kind '{}' (container, asset, key)", s))
    }
}

/// A placeholder field, tagged by the kind it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Container(ContainerField),
    Asset(AssetField),
    Key(KeyField),
}

impl Field {
    pub fn kind(self) -> ResourceKind {
        match self {
            Field::Container(_) => ResourceKind::Container,
            Field::Asset(_) => ResourceKind::Asset,
            Field::Key(_) => ResourceKind::Key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerField {
    ContainerName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetField {
    AssetId,
    AssetName,
    AlternateId,
    ContainerName,
    StreamingUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    KeyId,
    PolicyName,
}

impl ContainerField {
    pub fn parse(key: &str) -> Option<Self> {
        key.eq_ignore_ascii_case("ContainerName")
            .then_some(ContainerField::ContainerName)
    }
}

impl AssetField {
    const VARIANTS: [AssetField; 5] = [
        AssetField::AssetId,
        AssetField::AssetName,
        AssetField::AlternateId,
        AssetField::ContainerName,
        AssetField::StreamingUrl,
    ];

    pub fn parse(key: &str) -> Option<Self> {
        Self::VARIANTS
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(key))
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetField::AssetId => "AssetId",
            AssetField::AssetName => "AssetName",
            AssetField::AlternateId => "AlternateId",
            AssetField::ContainerName => "ContainerName",
            AssetField::StreamingUrl => "StreamingUrl",
        }
    }
}

impl KeyField {
    pub fn parse(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("KeyId") {
            Some(KeyField::KeyId)
        } else if key.eq_ignore_ascii_case("PolicyName") {
            Some(KeyField::PolicyName)
        } else {
            None
        }
    }
}
