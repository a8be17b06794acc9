//! `key-auth` consumer plugin

use super::{default_from_api, disable_attribute, Plugin};
use crate::convert::JsonMap;
use apisix_core::Result;
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// API key of a consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyAuthPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// The key, stored encrypted by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Plugin for KeyAuthPlugin {
    const NAME: &'static str = "key-auth";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            ("key", Attribute::string().required().sensitive()),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    fn from_api(value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let mut plugin: Self = default_from_api(value)?;
        if let Some(key) = prior.and_then(|p| p.key.clone()) {
            plugin.key = Some(key);
        }
        Ok(plugin)
    }
}
