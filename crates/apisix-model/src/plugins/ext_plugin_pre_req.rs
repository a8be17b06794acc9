//! `ext-plugin-pre-req` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Runs external plugins through the plugin runner before built-in ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtPluginPreReqPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// External plugins to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<Vec<ExtPluginConf>>,
    /// Keep serving when the plugin runner is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_degradation: Option<bool>,
}

/// One external plugin invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtPluginConf {
    /// Name of the external plugin
    pub name: String,
    /// Configuration passed to it, usually JSON
    pub value: String,
}

impl Plugin for ExtPluginPreReqPlugin {
    const NAME: &'static str = "ext-plugin-pre-req";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "conf",
                Attribute::list_nested(attributes([
                    ("name", Attribute::string().required()),
                    ("value", Attribute::string().required()),
                ]))
                .required(),
            ),
            ("allow_degradation", Attribute::bool().default_value(false)),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conf_list() {
        let api = json!({
            "conf": [{"name": "auth", "value": "{\"realm\":\"x\"}"}],
            "allow_degradation": false
        });
        let plugin = ExtPluginPreReqPlugin::from_api(api.as_object().unwrap(), None).unwrap();
        let conf = plugin.conf.clone().unwrap();
        assert_eq!(conf[0].name, "auth");
        assert_eq!(plugin.disable, Some(false));

        let out = plugin.to_api().unwrap();
        assert_eq!(out["conf"], api["conf"]);
        assert_eq!(out["_meta"], json!({"disable": false}));
    }
}
