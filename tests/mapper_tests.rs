//! # TemplateMapper Tests
//!
//! End-to-end checks of the public mapping API:
//! - validation at load time
//! - asset / container / key expansion through the manifest data source
//! - right-to-left substitution with values of different lengths
//! - failure propagation from locator lookups

use ams_migrate::source::AssetEntry;
use ams_migrate::{
    split_path, validate, Asset, ContentKey, Manifest, MigrateError, ResourceKind,
    StreamingLocator, TemplateMapper, ValueResolver,
};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use uuid::Uuid;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn manifest_with(asset: Asset, locators: Vec<StreamingLocator>) -> Manifest {
    Manifest {
        assets: vec![AssetEntry {
            asset,
            files: vec![],
            locators,
        }],
        ..Default::default()
    }
}

/// Resolves `${Short}` and `${Long}` only
struct LengthResolver;

#[async_trait]
impl ValueResolver for LengthResolver {
    async fn resolve(&self, key: &str) -> ams_migrate::error::Result<Option<String>> {
        Ok(match key {
            "Short" => Some("s".to_string()),
            "Long" => Some("a-considerably-longer-value".to_string()),
            _ => None,
        })
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_validation_accepts_every_listed_field() {
    for kind in ResourceKind::ALL {
        let template: String = kind
            .field_names()
            .iter()
            .map(|name| format!("${{{}}}", name))
            .collect::<Vec<_>>()
            .join("/");
        assert!(validate(&template, kind).is_ok(), "{}: {}", kind, template);
    }
}

#[test]
fn test_validation_names_offending_key() {
    let err = validate("${KeyId}/${AssetName}", ResourceKind::Key).unwrap_err();
    match err {
        MigrateError::InvalidTemplate { key, kind } => {
            assert_eq!(key, "AssetName");
            assert_eq!(kind, ResourceKind::Key);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

// ============================================================================
// EXPANSION
// ============================================================================

#[tokio::test]
async fn test_asset_name_and_container_example() {
    let mapper = TemplateMapper::new();
    let asset = Asset::new("My Video").with_container("abc123");
    let manifest = manifest_with(asset.clone(), vec![]);

    let split = mapper
        .expand_asset_template(&asset, &manifest, "${AssetName}/${ContainerName}")
        .await
        .unwrap();
    assert_eq!(split.container, "my-video");
    assert_eq!(split.prefix, "abc123/");
}

#[tokio::test]
async fn test_all_asset_fields() {
    let mapper = TemplateMapper::new();
    let id = Uuid::parse_str("6c2fd6a9-1f23-4bd4-9f4f-0b8f6a1b2c3d").unwrap();
    let asset = Asset::new("Intro")
        .with_id(id)
        .with_container("asset-6c2f")
        .with_alternate_id("EXT_9");
    let manifest = manifest_with(
        asset.clone(),
        vec![StreamingLocator {
            name: "default".to_string(),
            id: None,
            paths: vec!["hls".to_string()],
        }],
    );

    let split = mapper
        .expand_asset_template(
            &asset,
            &manifest,
            "${ContainerName}/${AssetName}/${AlternateId}/${AssetId}/${StreamingUrl}",
        )
        .await
        .unwrap();
    assert_eq!(split.container, "asset-6c2f");
    assert_eq!(
        split.prefix,
        "intro/ext-9/6c2fd6a9-1f23-4bd4-9f4f-0b8f6a1b2c3d/hls/"
    );
}

#[tokio::test]
async fn test_mixed_length_substitutions_do_not_shift() {
    let mapper = TemplateMapper::new();
    let a = mapper
        .expand_template("${Long}-x-${Short}-y-${Long}", &LengthResolver)
        .await
        .unwrap();
    let b = mapper
        .expand_template("${Short}-x-${Long}-y-${Short}", &LengthResolver)
        .await
        .unwrap();
    assert_eq!(a, "a-considerably-longer-value-x-s-y-a-considerably-longer-value");
    assert_eq!(b, "s-x-a-considerably-longer-value-y-s");
}

#[tokio::test]
async fn test_placeholder_keys_match_case_insensitively() {
    let mapper = TemplateMapper::new();
    let asset = Asset::new("Clip").with_container("c1");
    let manifest = manifest_with(asset.clone(), vec![]);
    let split = mapper
        .expand_asset_template(&asset, &manifest, "${containername}/${ASSETNAME}")
        .await
        .unwrap();
    assert_eq!(split, split_path("c1/clip"));
}

#[tokio::test]
async fn test_missing_locator_raises_not_found() {
    let mapper = TemplateMapper::new();
    let asset = Asset::new("VideoX");
    let manifest = manifest_with(asset.clone(), vec![]);

    let err = mapper
        .expand_asset_template(&asset, &manifest, "${StreamingUrl}")
        .await
        .unwrap_err();
    match err {
        MigrateError::ResolutionNotFound { field, resource } => {
            assert_eq!(field, "StreamingUrl");
            assert!(resource.contains("VideoX"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_template_expands_to_padding() {
    let mapper = TemplateMapper::new();
    assert_eq!(mapper.expand_template("", &LengthResolver).await.unwrap(), "aaa");
}

#[tokio::test]
async fn test_key_templates() {
    let mapper = TemplateMapper::new();
    let key = ContentKey {
        id: Uuid::parse_str("0d7c9a53-3b8e-4a55-8e3c-0c4b2f9d1e77").unwrap(),
        policy_name: Some("Widevine Policy".to_string()),
    };

    assert_eq!(
        mapper.expand_key_template(&key, None).await.unwrap(),
        "0d7c9a53-3b8e-4a55-8e3c-0c4b2f9d1e77"
    );
    assert_eq!(
        mapper
            .expand_key_template(&key, Some("${PolicyName}-${KeyId}"))
            .await
            .unwrap(),
        "widevine-policy-0d7c9a53-3b8e-4a55-8e3c-0c4b2f9d1e77"
    );
}

#[tokio::test]
async fn test_expansion_is_not_cached_across_calls() {
    let mapper = TemplateMapper::new();
    let first = Asset::new("First");
    let second = Asset::new("Second");
    let manifest = Manifest::default();

    let a = mapper
        .expand_asset_template(&first, &manifest, "${AssetName}")
        .await
        .unwrap();
    let b = mapper
        .expand_asset_template(&second, &manifest, "${AssetName}")
        .await
        .unwrap();
    assert_eq!(a.container, "first");
    assert_eq!(b.container, "second");
}
