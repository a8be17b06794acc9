//! State file: what was applied, keyed by resource address

use apisix_core::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Version of the state file format
pub const STATE_VERSION: u32 = 1;

/// Default state file name
pub const DEFAULT_STATE_FILE: &str = "apisix.tfstate";

/// Applied resources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// File format version
    pub version: u32,
    /// Incremented on every save
    pub serial: u64,
    /// Identifies the history a state file belongs to
    pub lineage: Uuid,
    /// Time of the last save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Resources by address
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

/// State of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Local name
    pub name: String,
    /// Identifier of the remote object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Attribute values
    pub attributes: Value,
    /// Addresses this resource depended on when applied
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// Empty state with a fresh lineage
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            serial: 0,
            lineage: Uuid::new_v4(),
            updated_at: None,
            resources: BTreeMap::new(),
        }
    }

    /// Load the state at `path`, or an empty state when the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No state file, starting empty");
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let state: State = serde_json::from_str(&content)
            .map_err(|e| Error::State(format!("Failed to parse {}: {e}", path.display())))?;
        if state.version > STATE_VERSION {
            return Err(Error::State(format!(
                "{} has format version {}, this build supports up to {STATE_VERSION}",
                path.display(),
                state.version
            )));
        }

        debug!(
            path = %path.display(),
            serial = state.serial,
            resources = state.resources.len(),
            "Loaded state"
        );
        Ok(state)
    }

    /// Write the state to `path`, bumping the serial.
    ///
    /// The file is written next to its destination and renamed into place.
    /// The previous file is kept with a `.backup` suffix.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.serial += 1;
        self.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(self)?;
        let tmp = sibling(path, "tmp");
        fs::write(&tmp, content)?;
        if path.exists() {
            fs::copy(path, sibling(path, "backup"))?;
        }
        fs::rename(&tmp, path)?;

        info!(
            path = %path.display(),
            serial = self.serial,
            resources = self.resources.len(),
            "Saved state"
        );
        Ok(())
    }

    /// State of the resource at `address`
    pub fn get(&self, address: &str) -> Option<&ResourceState> {
        self.resources.get(address)
    }

    /// Record a resource
    pub fn insert(&mut self, address: impl Into<String>, resource: ResourceState) {
        self.resources.insert(address.into(), resource);
    }

    /// Forget a resource, returning its last state
    pub fn remove(&mut self, address: &str) -> Option<ResourceState> {
        self.resources.remove(address)
    }

    /// Attribute of a resource in state
    pub fn attribute(&self, address: &str, attribute: &str) -> Option<&Value> {
        self.get(address)?
            .attributes
            .get(attribute)
            .filter(|value| !value.is_null())
    }

    /// Addresses ordered so that a resource comes before the resources it
    /// depends on, the order to destroy them in
    pub fn destroy_order(&self) -> Vec<String> {
        let mut remaining: Vec<&String> = self.resources.keys().collect();
        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let position = remaining
                .iter()
                .position(|address| {
                    !remaining.iter().any(|other| {
                        self.resources[other.as_str()]
                            .dependencies
                            .iter()
                            .any(|dep| dep == *address)
                    })
                })
                .unwrap_or(0);
            order.push(remaining.remove(position).clone());
        }
        order
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

impl ResourceState {
    /// State of the resource `resource_type.name`
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        id: Option<String>,
        attributes: Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            id,
            attributes,
            dependencies: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(resource_type: &str, name: &str, dependencies: &[&str]) -> ResourceState {
        let mut resource = ResourceState::new(
            resource_type,
            name,
            Some("1".to_string()),
            json!({"id": "1"}),
        );
        resource.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        resource
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = State::load(&dir.path().join(DEFAULT_STATE_FILE)).unwrap();
        assert_eq!(state.serial, 0);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STATE_FILE);

        let mut state = State::new();
        state.insert("apisix_upstream.backend", resource("apisix_upstream", "backend", &[]));
        state.save(&path).unwrap();
        state.save(&path).unwrap();

        let loaded = State::load(&path).unwrap();
        assert_eq!(loaded.serial, 2);
        assert_eq!(loaded.lineage, state.lineage);
        assert_eq!(loaded.attribute("apisix_upstream.backend", "id"), Some(&json!("1")));
        assert!(sibling(&path, "backup").exists());
        assert!(!sibling(&path, "tmp").exists());
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_STATE_FILE);
        let mut state = State::new();
        state.version = STATE_VERSION + 1;
        fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        assert!(matches!(State::load(&path), Err(Error::State(_))));
    }

    #[test]
    fn test_destroy_order() {
        let mut state = State::new();
        state.insert("apisix_upstream.backend", resource("apisix_upstream", "backend", &[]));
        state.insert(
            "apisix_route.api",
            resource("apisix_route", "api", &["apisix_service.billing"]),
        );
        state.insert(
            "apisix_service.billing",
            resource("apisix_service", "billing", &["apisix_upstream.backend"]),
        );

        assert_eq!(
            state.destroy_order(),
            vec![
                "apisix_route.api",
                "apisix_service.billing",
                "apisix_upstream.backend"
            ]
        );
    }
}
