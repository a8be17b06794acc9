//! `apisix_route`: matching rules plus the plugins and upstream that
//! handle matched requests

use crate::api_model::ApiModel;
use crate::convert::{get, get_int, json_array, put, vars_from_api, vars_to_api, JsonMap};
use crate::plugins::{custom_plugins_attribute, plugins_from_api, plugins_to_api, PluginSet, PluginsModel};
use crate::timeout::{timeout_attribute, TimeoutModel};
use crate::upstream::{inline_upstream_attribute, UpstreamModel};
use apisix_core::{ObjectKind, Result, HTTP_METHODS};
use apisix_schema::validator::{at_least_one_of, conflicts_with, each, elements_greater_than, one_of};
use apisix_schema::{attributes, Attribute, ElementKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Route resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteModel {
    /// Identifier assigned by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Request path, may end with `*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Request paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    /// Request host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Request hosts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Client address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    /// Client addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addrs: Option<Vec<String>>,
    /// HTTP methods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    /// Matching priority when several routes match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Whether the route handles requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    /// Proxy websocket connections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_websocket: Option<bool>,
    /// Service the route belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Upstream handling matched requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
    /// Labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Lua script orchestrating plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Plugin config bound to the route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_config_id: Option<String>,
    /// Lua matching function
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_func: Option<String>,
    /// Typed plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsModel>,
    /// JSON object of plugins without a dedicated block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_plugins: Option<String>,
    /// Embedded upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamModel>,
    /// JSON array of `[var, operator, value]` matching expressions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<String>,
    /// Timeouts towards the upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutModel>,
}

impl ApiModel for RouteModel {
    const KIND: ObjectKind = ObjectKind::Route;
    const TYPE_NAME: &'static str = "apisix_route";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "id",
                Attribute::string().computed().use_state_for_unknown(),
            ),
            ("name", Attribute::string().required()),
            (
                "desc",
                Attribute::string().default_value("Managed by Terraform"),
            ),
            (
                "uri",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["uris"])),
            ),
            (
                "uris",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_greater_than(0))
                    .validator(conflicts_with(&["uri"])),
            ),
            (
                "host",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["hosts"])),
            ),
            (
                "hosts",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_greater_than(0))
                    .validator(conflicts_with(&["host"])),
            ),
            (
                "remote_addr",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["remote_addrs"])),
            ),
            (
                "remote_addrs",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_greater_than(0))
                    .validator(conflicts_with(&["remote_addr"])),
            ),
            (
                "methods",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(each(one_of(HTTP_METHODS))),
            ),
            ("priority", Attribute::int64().default_value(0)),
            ("is_enabled", Attribute::bool().default_value(true)),
            ("enable_websocket", Attribute::bool().default_value(false)),
            ("service_id", Attribute::string().optional()),
            (
                "upstream_id",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["upstream"])),
            ),
            ("labels", Attribute::map(ElementKind::String).optional()),
            (
                "script",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["plugin_config_id"])),
            ),
            (
                "plugin_config_id",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["script"])),
            ),
            ("filter_func", Attribute::string().optional()),
            ("plugins", PluginsModel::schema()),
            ("custom_plugins", custom_plugins_attribute::<PluginsModel>()),
            ("upstream", inline_upstream_attribute()),
            (
                "vars",
                Attribute::string()
                    .optional()
                    .validator(json_array())
                    .description("JSON array of matching expressions, for example `[[\"arg_name\", \"==\", \"json\"]]`."),
            ),
            ("timeout", timeout_attribute()),
        ]))
        .version(8)
        .description("Manages routes.")
        .validator(at_least_one_of(&["uri", "uris"]))
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "name", &self.name)?;
        put(&mut out, "desc", &self.desc)?;
        put(&mut out, "uri", &self.uri)?;
        put(&mut out, "uris", &self.uris)?;
        put(&mut out, "host", &self.host)?;
        put(&mut out, "hosts", &self.hosts)?;
        put(&mut out, "remote_addr", &self.remote_addr)?;
        put(&mut out, "remote_addrs", &self.remote_addrs)?;
        put(&mut out, "methods", &self.methods)?;
        put(&mut out, "priority", &self.priority)?;
        put(&mut out, "status", &self.is_enabled.map(i64::from))?;
        put(&mut out, "enable_websocket", &self.enable_websocket)?;
        put(&mut out, "service_id", &self.service_id)?;
        put(&mut out, "upstream_id", &self.upstream_id)?;
        put(&mut out, "labels", &self.labels)?;
        put(&mut out, "script", &self.script)?;
        put(&mut out, "plugin_config_id", &self.plugin_config_id)?;
        put(&mut out, "filter_func", &self.filter_func)?;
        put(&mut out, "timeout", &self.timeout)?;
        vars_to_api(&self.vars, &mut out)?;

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
            uri: get(value, "uri")?,
            uris: get(value, "uris")?,
            host: get(value, "host")?,
            hosts: get(value, "hosts")?,
            remote_addr: get(value, "remote_addr")?,
            remote_addrs: get(value, "remote_addrs")?,
            methods: get(value, "methods")?,
            priority: get_int(value, "priority")?,
            is_enabled: get_int(value, "status")?.map(|status| status == 1),
            enable_websocket: get(value, "enable_websocket")?,
            service_id: get(value, "service_id")?,
            upstream_id: get(value, "upstream_id")?,
            labels: get(value, "labels")?,
            script: get(value, "script")?,
            plugin_config_id: get(value, "plugin_config_id")?,
            filter_func: get(value, "filter_func")?,
            plugins,
            custom_plugins,
            upstream: UpstreamModel::inline_from_api(
                value.get("upstream"),
                prior.and_then(|p| p.upstream.as_ref()),
            )?,
            vars: vars_from_api(value, prior.and_then(|p| p.vars.as_ref()))?,
            timeout: get(value, "timeout")?,
        })
    }
}
