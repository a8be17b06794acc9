//! `basic-auth` consumer plugin

use super::{default_from_api, disable_attribute, Plugin};
use crate::convert::JsonMap;
use apisix_core::Result;
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// HTTP basic authentication credentials of a consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicAuthPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// User name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password, stored encrypted by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Plugin for BasicAuthPlugin {
    const NAME: &'static str = "basic-auth";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            ("username", Attribute::string().required()),
            ("password", Attribute::string().required().sensitive()),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    fn from_api(value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let mut plugin: Self = default_from_api(value)?;
        if let Some(password) = prior.and_then(|p| p.password.clone()) {
            plugin.password = Some(password);
        }
        Ok(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_password_kept_from_prior() {
        let prior = BasicAuthPlugin {
            disable: Some(false),
            username: Some("foo".to_string()),
            password: Some("bar".to_string()),
        };
        let api = json!({"username": "foo", "password": "c2VjcmV0LWVuY3J5cHRlZA=="});
        let plugin = BasicAuthPlugin::from_api(api.as_object().unwrap(), Some(&prior)).unwrap();
        assert_eq!(plugin, prior);

        let imported = BasicAuthPlugin::from_api(api.as_object().unwrap(), None).unwrap();
        assert_eq!(imported.password.as_deref(), Some("c2VjcmV0LWVuY3J5cHRlZA=="));
    }
}
