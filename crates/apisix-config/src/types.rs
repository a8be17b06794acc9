//! Document types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// A declarative document: provider settings plus the objects to manage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Provider settings
    #[serde(default)]
    pub provider: ProviderBlock,

    /// Managed objects
    #[serde(default)]
    pub resources: Vec<ResourceBlock>,

    /// Read-only lookups
    #[serde(default)]
    pub data: Vec<DataBlock>,
}

impl Document {
    /// Resource with the given `type.name` address
    pub fn resource(&self, address: &str) -> Option<&ResourceBlock> {
        self.resources.iter().find(|r| r.address() == address)
    }

    /// Data source with the given `data.type.name` address
    pub fn data_source(&self, address: &str) -> Option<&DataBlock> {
        self.data.iter().find(|d| d.address() == address)
    }
}

/// Provider settings. Unset fields fall back to the environment.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderBlock {
    /// Admin API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Admin API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Attempts for idempotent requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_attempts: Option<u32>,
}

impl fmt::Debug for ProviderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBlock")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .finish()
    }
}

/// A managed object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceBlock {
    /// Resource type, such as `apisix_route`
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Local name, unique per type
    pub name: String,

    /// Attribute values
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Addresses of resources that must be applied first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ResourceBlock {
    /// Resource of `resource_type` named `name` with `config`
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, config: Map<String, Value>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            config,
            depends_on: Vec::new(),
        }
    }

    /// `type.name`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }
}

/// A read-only lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataBlock {
    /// Data source type, such as `apisix_upstream`
    #[serde(rename = "type")]
    pub data_type: String,

    /// Local name, unique per type
    pub name: String,

    /// Lookup arguments
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl DataBlock {
    /// `data.type.name`
    pub fn address(&self) -> String {
        format!("data.{}.{}", self.data_type, self.name)
    }
}
