//! `response-rewrite` plugin

use super::{default_from_api, default_to_api, disable_attribute, Plugin};
use crate::convert::{json_array, vars_from_api, vars_to_api, JsonMap};
use apisix_core::Result;
use apisix_schema::validator::int_between;
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rewrites the response returned to the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseRewritePlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// New status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    /// New body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `body` is base64 encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<bool>,
    /// Headers to set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Conditions, as a JSON array, under which the rewrite applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<String>,
}

impl Plugin for ResponseRewritePlugin {
    const NAME: &'static str = "response-rewrite";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "status_code",
                Attribute::int64()
                    .optional()
                    .validator(int_between(200, 598)),
            ),
            ("body", Attribute::string().optional()),
            ("body_base64", Attribute::bool().default_value(false)),
            ("headers", Attribute::map(ElementKind::String).optional()),
            (
                "vars",
                Attribute::string()
                    .optional()
                    .description("JSON string")
                    .validator(json_array()),
            ),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = default_to_api(self)?;
        out.remove("vars");
        vars_to_api(&self.vars, &mut out)?;
        Ok(out)
    }

    fn from_api(value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let vars = vars_from_api(value, prior.and_then(|p| p.vars.as_ref()))?;
        let mut value = value.clone();
        value.remove("vars");
        let mut plugin: Self = default_from_api(&value)?;
        plugin.vars = vars;
        Ok(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_vars_as_array() {
        let plugin = ResponseRewritePlugin {
            disable: Some(false),
            status_code: Some(200),
            body: Some("{\"code\":\"ok\"}".to_string()),
            vars: Some(r#"[["status", "==", 500]]"#.to_string()),
            ..Default::default()
        };
        let api = plugin.to_api().unwrap();
        assert_eq!(api["vars"], json!([["status", "==", 500]]));
        assert_eq!(api["status_code"], 200);

        let back = ResponseRewritePlugin::from_api(&api, Some(&plugin)).unwrap();
        assert_eq!(back, plugin);
    }

    #[test]
    fn test_vars_without_prior_are_compact() {
        let api = json!({"vars": [["status", "==", 500]]});
        let plugin = ResponseRewritePlugin::from_api(api.as_object().unwrap(), None).unwrap();
        assert_eq!(plugin.vars.as_deref(), Some(r#"[["status","==",500]]"#));
        assert_eq!(plugin.headers, None);
        assert!(matches!(
            Value::Object(plugin.to_api().unwrap())["_meta"]["disable"],
            Value::Bool(false)
        ));
    }
}
