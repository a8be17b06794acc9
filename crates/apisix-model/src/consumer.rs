//! `apisix_consumer`: an API client identified by its username

use crate::api_model::ApiModel;
use crate::convert::{get, put, JsonMap};
use crate::plugins::{
    custom_plugins_attribute, plugins_from_api, plugins_to_api, ConsumerPluginsModel, PluginSet,
};
use apisix_core::{ObjectKind, Result};
use apisix_schema::{attributes, Attribute, ElementKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Consumer resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerModel {
    /// Username, also the identifier of the consumer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Authentication plugins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<ConsumerPluginsModel>,
    /// JSON object of plugins without a dedicated block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_plugins: Option<String>,
}

impl ApiModel for ConsumerModel {
    const KIND: ObjectKind = ObjectKind::Consumer;
    const TYPE_NAME: &'static str = "apisix_consumer";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "username",
                Attribute::string()
                    .required()
                    .requires_replace()
                    .description("Consumer name, changing it recreates the consumer."),
            ),
            ("desc", Attribute::string().optional()),
            ("labels", Attribute::map(ElementKind::String).optional()),
            ("plugins", ConsumerPluginsModel::schema()),
            (
                "custom_plugins",
                custom_plugins_attribute::<ConsumerPluginsModel>(),
            ),
        ]))
        .description("Manages consumers.")
    }

    fn id(&self) -> Option<&str> {
        self.username.as_deref()
    }

    fn assigned_id(&self) -> Option<String> {
        self.username.clone()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "username", &self.username)?;
        put(&mut out, "desc", &self.desc)?;
        put(&mut out, "labels", &self.labels)?;
        if let Some(plugins) = plugins_to_api(&self.plugins, &self.custom_plugins)? {
            out.insert("plugins".to_string(), Value::Object(plugins));
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
            username: get(value, "username")?.or_else(|| Some(id.to_string())),
            desc: get(value, "desc")?,
            labels: get(value, "labels")?,
            plugins,
            custom_plugins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{BasicAuthPlugin, KeyAuthPlugin};
    use apisix_schema::{replace_paths, validate_config};
    use serde_json::json;

    #[test]
    fn test_username_is_identity() {
        let model = ConsumerModel {
            username: Some("jack".to_string()),
            ..Default::default()
        };
        assert_eq!(model.id(), Some("jack"));
        assert_eq!(model.assigned_id().as_deref(), Some("jack"));
        assert_eq!(model.to_api().unwrap()["username"], json!("jack"));
    }

    #[test]
    fn test_rename_requires_replace() {
        let paths = replace_paths(
            &ConsumerModel::schema(),
            &json!({"username": "jill"}),
            &json!({"username": "jack"}),
        );
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "username");
    }

    #[test]
    fn test_credentials_carried_from_state() {
        let prior = ConsumerModel {
            username: Some("jack".to_string()),
            plugins: Some(ConsumerPluginsModel {
                basic_auth: Some(BasicAuthPlugin {
                    disable: Some(false),
                    username: Some("jack".to_string()),
                    password: Some("secret".to_string()),
                }),
                key_auth: Some(KeyAuthPlugin {
                    disable: Some(false),
                    key: Some("auth-one".to_string()),
                }),
                jwt_auth: None,
            }),
            ..Default::default()
        };
        let api = json!({
            "username": "jack",
            "plugins": {
                "basic-auth": {"username": "jack", "password": "HASHED", "_meta": {"disable": false}},
                "key-auth": {"key": "ENCRYPTED", "_meta": {"disable": false}}
            }
        });
        let model = ConsumerModel::from_api("jack", api.as_object().unwrap(), Some(&prior)).unwrap();
        assert_eq!(model, prior);
    }

    #[test]
    fn test_unknown_auth_plugin_rejected_in_custom() {
        let diags = validate_config(
            &ConsumerModel::schema(),
            &json!({"username": "jack", "custom_plugins": "{\"key-auth\": {}}"}),
        );
        assert!(diags.has_error());
    }
}
