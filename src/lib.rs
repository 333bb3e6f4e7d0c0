//! ams-migrate - template mapping of media assets into blob storage
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`field`] | Resource kinds and the placeholder fields each accepts |
//! | [`template`] | `${Key}` grammar, validation, `TemplateMapper` expansion |
//! | [`resolver`] | Per-kind value resolvers (container, asset, key) |
//! | [`sanitize`] | Storage name normalization |
//! | [`path`] | Container / blob prefix split |
//! | [`source`] | Asset, container and key records; manifest data source |
//! | [`upload`] | Upload sink trait and local blob store |
//! | [`migrate`] | Per-unit migration with failure isolation |
//! | [`config`] | YAML + environment configuration |
//! | [`error`] | Error types with fix suggestions |

pub mod config;
pub mod error;
pub mod field;
pub mod migrate;
pub mod path;
pub mod resolver;
pub mod sanitize;
pub mod source;
pub mod template;
pub mod upload;

pub use config::{MigrationConfig, Templates};
pub use error::{FixSuggestion, MigrateError};
pub use field::ResourceKind;
pub use migrate::{MigrationReport, Migrator};
pub use path::{split_path, ContainerPrefix};
pub use resolver::ValueResolver;
pub use sanitize::sanitize_resource_name;
pub use source::{Asset, Container, ContentKey, LocatorClient, Manifest, StreamingLocator};
pub use template::{validate, Template, TemplateMapper};
pub use upload::{LocalBlobStore, Uploader};
