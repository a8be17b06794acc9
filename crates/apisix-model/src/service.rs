//! `apisix_service`: plugins and upstream shared by several routes

use crate::api_model::ApiModel;
use crate::convert::{get, put, JsonMap};
use crate::plugins::{custom_plugins_attribute, plugins_from_api, plugins_to_api, PluginSet, PluginsModel};
use crate::upstream::{inline_upstream_attribute, UpstreamModel};
use apisix_core::{ObjectKind, Result};
use apisix_schema::validator::conflicts_with;
use apisix_schema::{attributes, Attribute, ElementKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Service resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceModel {
    /// Identifier assigned by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Proxy websocket connections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_websocket: Option<bool>,
    /// Request hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Typed plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsModel>,
    /// JSON object of plugins without a dedicated block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_plugins: Option<String>,
    /// Upstream handling requests of the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
    /// Embedded upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamModel>,
}

impl ApiModel for ServiceModel {
    const KIND: ObjectKind = ObjectKind::Service;
    const TYPE_NAME: &'static str = "apisix_service";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "id",
                Attribute::string()
                    .computed()
                    .use_state_for_unknown()
                    .description("Identifier of the service."),
            ),
            ("name", Attribute::string().optional()),
            (
                "desc",
                Attribute::string()
                    .optional()
                    .description("Description of usage scenarios."),
            ),
            (
                "enable_websocket",
                Attribute::bool()
                    .default_value(false)
                    .description("Enables websocket. Set to `false` by default."),
            ),
            ("hosts", Attribute::list(ElementKind::String).optional()),
            ("labels", Attribute::map(ElementKind::String).optional()),
            ("plugins", PluginsModel::schema()),
            ("custom_plugins", custom_plugins_attribute::<PluginsModel>()),
            (
                "upstream_id",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["upstream"])),
            ),
            ("upstream", inline_upstream_attribute()),
        ]))
        .description("Manages services.")
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "name", &self.name)?;
        put(&mut out, "desc", &self.desc)?;
        put(&mut out, "enable_websocket", &self.enable_websocket)?;
        put(&mut out, "hosts", &self.hosts)?;
        put(&mut out, "labels", &self.labels)?;
        put(&mut out, "upstream_id", &self.upstream_id)?;
        if let Some(plugins) = plugins_to_api(&self.plugins, &self.custom_plugins)? {
            out.insert("plugins".to_string(), Value::Object(plugins));
        }
        if let Some(upstream) = &self.upstream {
            out.insert("upstream".to_string(), Value::Object(upstream.fields_to_api()?));
        }
        Ok(out)
    }

    fn from_api(id: &str, value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let (plugins, custom_plugins) = plugins_from_api(
            value.get("plugins"),
            prior.and_then(|p| p.plugins.as_ref()),
            prior.and_then(|p| p.custom_plugins.as_deref()),
        )?;
        Ok(Self {
            id: Some(id.to_string()),
            name: get(value, "name")?,
            desc: get(value, "desc")?,
            enable_websocket: get(value, "enable_websocket")?,
            hosts: get(value, "hosts")?,
            labels: get(value, "labels")?,
            plugins,
            custom_plugins,
            upstream_id: get(value, "upstream_id")?,
            upstream: UpstreamModel::inline_from_api(
                value.get("upstream"),
                prior.and_then(|p| p.upstream.as_ref()),
            )?,
        })
    }
}
