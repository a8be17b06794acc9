//! `apisix_plugin_metadata_log_format`: log format shared by every
//! instance of a logger plugin

use crate::api_model::ApiModel;
use crate::convert::{get, put, JsonMap};
use apisix_core::{ObjectKind, Result};
use apisix_schema::validator::one_of;
use apisix_schema::{attributes, Attribute, ElementKind, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logger plugins whose metadata carries a `log_format`
pub const LOGGER_PLUGINS: &[&str] = &[
    "http-logger",
    "gelf-udp-logger",
    "tcp-logger",
    "udp-logger",
    "kafka-logger",
    "syslog",
    "file-logger",
];

/// Plugin metadata resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadataModel {
    /// Logger plugin name, also the identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_name: Option<String>,
    /// Log entry fields, values use APISIX variables such as `$remote_addr`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<BTreeMap<String, String>>,
}

impl ApiModel for PluginMetadataModel {
    const KIND: ObjectKind = ObjectKind::PluginMetadata;
    const TYPE_NAME: &'static str = "apisix_plugin_metadata_log_format";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "plugin_name",
                Attribute::string()
                    .required()
                    .requires_replace()
                    .validator(one_of(LOGGER_PLUGINS)),
            ),
            (
                "log_format",
                Attribute::map(ElementKind::String)
                    .required()
                    .description("Log format, for example `{\"host\" = \"$host\"}`."),
            ),
        ]))
        .description("Manages the log format of logger plugins.")
    }

    fn id(&self) -> Option<&str> {
        self.plugin_name.as_deref()
    }

    fn assigned_id(&self) -> Option<String> {
        self.plugin_name.clone()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "log_format", &self.log_format)?;
        Ok(out)
    }

    fn from_api(id: &str, value: &JsonMap, _prior: Option<&Self>) -> Result<Self> {
        Ok(Self {
            plugin_name: Some(id.to_string()),
            log_format: get(value, "log_format")?,
        })
    }
}
