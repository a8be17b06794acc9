//! Document validation

use crate::graph::dependency_order;
use crate::reference::ReferenceScanner;
use crate::types::{Document, ProviderBlock};
use apisix_core::{Error, Result};
use serde_json::Value;
use std::collections::BTreeSet;

const TYPE_PREFIX: &str = "apisix_";

/// Validate a document.
///
/// Checks block types and names, duplicate addresses, `depends_on` and
/// reference targets, dependency cycles and the provider endpoint.
/// Attribute values are checked later against the resource schemas.
pub fn validate_document(document: &Document) -> Result<()> {
    validate_provider(&document.provider)?;

    let mut addresses = BTreeSet::new();
    for resource in &document.resources {
        validate_block(&resource.resource_type, &resource.name)?;
        if !addresses.insert(resource.address()) {
            return Err(Error::Config(format!(
                "Duplicate resource {}",
                resource.address()
            )));
        }
    }
    for data in &document.data {
        validate_block(&data.data_type, &data.name)?;
        if !addresses.insert(data.address()) {
            return Err(Error::Config(format!(
                "Duplicate data source {}",
                data.address()
            )));
        }
    }

    validate_references(document, &addresses)?;
    dependency_order(document)?;

    Ok(())
}

fn validate_provider(provider: &ProviderBlock) -> Result<()> {
    if let Some(endpoint) = &provider.endpoint {
        let url = url::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("Invalid provider endpoint '{endpoint}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Provider endpoint must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if !url.path().trim_end_matches('/').ends_with("/apisix/admin") {
            tracing::warn!(
                endpoint = %endpoint,
                "Provider endpoint does not end with /apisix/admin"
            );
        }
    }

    if let Some(timeout) = provider.timeout {
        if timeout.is_zero() {
            return Err(Error::Config("Provider timeout must be > 0".to_string()));
        }
    }

    if provider.retry_attempts == Some(0) {
        return Err(Error::Config(
            "Provider retry_attempts must be at least 1".to_string(),
        ));
    }

    if provider.api_key.as_deref() == Some("") {
        tracing::warn!("Provider api_key is empty");
    }

    Ok(())
}

fn validate_block(block_type: &str, name: &str) -> Result<()> {
    if !block_type.starts_with(TYPE_PREFIX) {
        return Err(Error::Config(format!(
            "Unknown block type '{block_type}', expected an {TYPE_PREFIX}* type"
        )));
    }
    if !is_identifier(name) {
        return Err(Error::Config(format!(
            "Invalid name '{name}' for {block_type}: use letters, digits, '_' and '-', starting with a letter or '_'"
        )));
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_references(document: &Document, addresses: &BTreeSet<String>) -> Result<()> {
    let scanner = ReferenceScanner::new()?;

    for resource in &document.resources {
        for dependency in &resource.depends_on {
            if dependency.starts_with("data.") || !addresses.contains(dependency) {
                return Err(Error::Config(format!(
                    "{} depends on unknown resource {dependency}",
                    resource.address()
                )));
            }
        }

        for reference in scanner.in_value(&Value::Object(resource.config.clone())) {
            if !addresses.contains(&reference.address()) {
                return Err(Error::Config(format!(
                    "{} references unknown block {}",
                    resource.address(),
                    reference.address()
                )));
            }
            if reference.address() == resource.address() {
                return Err(Error::Config(format!(
                    "{} references itself",
                    resource.address()
                )));
            }
        }
    }

    for data in &document.data {
        if let Some(reference) = scanner
            .in_value(&Value::Object(data.config.clone()))
            .into_iter()
            .next()
        {
            return Err(Error::Config(format!(
                "{} arguments cannot reference {}",
                data.address(),
                reference
            )));
        }
    }

    Ok(())
}
