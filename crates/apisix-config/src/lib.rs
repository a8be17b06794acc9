//! # APISIX Configuration
//!
//! Declarative documents describing the objects to manage:
//! - Multiple formats (YAML, TOML, JSON)
//! - Environment variable expansion
//! - `${type.name.attribute}` references between blocks
//! - Layering several documents
//! - Validation and dependency ordering

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builder;
pub mod graph;
pub mod loader;
pub mod merger;
pub mod reference;
pub mod types;
pub mod validator;

pub use builder::DocumentBuilder;
pub use graph::{dependencies, dependency_order};
pub use loader::{expand_env_vars, load_and_merge, load_document, load_from_file, load_from_str};
pub use merger::merge_documents;
pub use reference::{Reference, ReferenceScanner};
pub use types::{DataBlock, Document, ProviderBlock, ResourceBlock};
pub use validator::validate_document;

use apisix_core::{Error, Result};
use std::path::Path;

/// Load and validate a document from a file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
    load_document(path)
}

/// Document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format
    Yaml,
    /// TOML format
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config("Unable to detect document format".to_string()))?;

        match ext {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::Config(format!("Unsupported document format: {ext}"))),
        }
    }
}
