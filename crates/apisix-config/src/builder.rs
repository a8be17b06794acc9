//! Document builder

use crate::types::{DataBlock, Document, ResourceBlock};
use apisix_core::{Error, Result};
use serde_json::{Map, Value};
use std::time::Duration;

/// Builder for constructing documents programmatically
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the admin API endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.document.provider.endpoint = Some(endpoint.into());
        self
    }

    /// Set the admin API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.document.provider.api_key = Some(api_key.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.document.provider.timeout = Some(timeout);
        self
    }

    /// Add a resource. `config` must be a JSON object.
    pub fn resource(
        mut self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        config: Value,
    ) -> Result<Self> {
        let resource = ResourceBlock::new(resource_type, name, into_object(config)?);
        self.document.resources.push(resource);
        Ok(self)
    }

    /// Add a data source. `config` must be a JSON object.
    pub fn data(
        mut self,
        data_type: impl Into<String>,
        name: impl Into<String>,
        config: Value,
    ) -> Result<Self> {
        self.document.data.push(DataBlock {
            data_type: data_type.into(),
            name: name.into(),
            config: into_object(config)?,
        });
        Ok(self)
    }

    /// Validate and return the document
    pub fn build(self) -> Result<Document> {
        crate::validator::validate_document(&self.document)?;
        Ok(self.document)
    }
}

fn into_object(config: Value) -> Result<Map<String, Value>> {
    match config {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(Error::Config(format!(
            "Block configuration must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let document = DocumentBuilder::new()
            .endpoint("http://127.0.0.1:9180/apisix/admin")
            .api_key("edd1c9f034335f136f87ad84b625c8f1")
            .resource("apisix_upstream", "backend", json!({"nodes": [{"host": "127.0.0.1", "port": 1980}]}))
            .unwrap()
            .resource("apisix_route", "api", json!({"uri": "/*", "upstream_id": "${apisix_upstream.backend.id}"}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(document.resources.len(), 2);
        assert_eq!(
            document.provider.endpoint.as_deref(),
            Some("http://127.0.0.1:9180/apisix/admin")
        );
    }

    #[test]
    fn test_builder_rejects_non_object() {
        assert!(DocumentBuilder::new()
            .resource("apisix_route", "api", json!(["uri"]))
            .is_err());
    }

    #[test]
    fn test_build_validates() {
        let result = DocumentBuilder::new()
            .resource("apisix_route", "api", json!({"upstream_id": "${apisix_upstream.gone.id}"}))
            .unwrap()
            .build();
        assert!(result.is_err());
    }
}
