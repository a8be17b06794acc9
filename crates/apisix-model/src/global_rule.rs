//! `apisix_global_rule`: plugins run on every request

use crate::api_model::ApiModel;
use crate::convert::JsonMap;
use crate::plugins::{custom_plugins_attribute, plugins_from_api, plugins_to_api, PluginSet, PluginsModel};
use apisix_core::{ObjectKind, Result};
use apisix_schema::validator::at_least_one_of;
use apisix_schema::{attributes, Attribute, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Global rule resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalRuleModel {
    /// Identifier chosen by the configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Typed plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsModel>,
    /// JSON object of plugins without a dedicated block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_plugins: Option<String>,
}

impl ApiModel for GlobalRuleModel {
    const KIND: ObjectKind = ObjectKind::GlobalRule;
    const TYPE_NAME: &'static str = "apisix_global_rule";

    fn schema() -> Schema {
        Schema::new(attributes([
            ("id", Attribute::string().required().requires_replace()),
            ("plugins", PluginsModel::schema()),
            ("custom_plugins", custom_plugins_attribute::<PluginsModel>()),
        ]))
        .description("Manages global rules.")
        .validator(at_least_one_of(&["plugins", "custom_plugins"]))
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assigned_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        let plugins = plugins_to_api(&self.plugins, &self.custom_plugins)?.unwrap_or_default();
        out.insert("plugins".to_string(), Value::Object(plugins));
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
            plugins,
            custom_plugins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_schema::validate_config;
    use serde_json::json;

    #[test]
    fn test_needs_plugins() {
        let schema = GlobalRuleModel::schema();
        assert!(validate_config(&schema, &json!({"id": "1"})).has_error());
        assert!(validate_config(&schema, &json!({"id": "1", "plugins": {"prometheus": {}}})).is_empty());
    }

    #[test]
    fn test_api_body_has_plugins_only() {
        let model = GlobalRuleModel {
            id: Some("1".to_string()),
            custom_plugins: Some(r#"{"limit-req": {"rate": 1}}"#.to_string()),
            ..Default::default()
        };
        let api = model.to_api().unwrap();
        assert_eq!(Value::Object(api), json!({"plugins": {"limit-req": {"rate": 1}}}));
        assert_eq!(model.assigned_id().as_deref(), Some("1"));
    }
}
