//! `jwt-auth` consumer plugin

use super::{default_from_api, disable_attribute, Plugin};
use crate::convert::JsonMap;
use apisix_core::Result;
use apisix_schema::validator::{int_at_least, one_of, requires_when};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// JSON Web Token credentials of a consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtAuthPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Identifies the consumer in the token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Signing secret for HMAC algorithms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Public key for RS256 and ES256
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Signing algorithm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// Token lifetime in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// `secret` is base64 encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_secret: Option<bool>,
    /// Clock skew tolerated when checking expiry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_grace_period: Option<i64>,
}

impl Plugin for JwtAuthPlugin {
    const NAME: &'static str = "jwt-auth";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            ("key", Attribute::string().required()),
            ("secret", Attribute::string().optional().sensitive()),
            ("public_key", Attribute::string().optional()),
            (
                "algorithm",
                Attribute::string()
                    .default_value("HS256")
                    .validator(one_of(&["HS256", "HS512", "RS256", "ES256"]))
                    .validator(requires_when("RS256", "public_key"))
                    .validator(requires_when("ES256", "public_key")),
            ),
            (
                "exp",
                Attribute::int64().default_value(86400).validator(int_at_least(1)),
            ),
            ("base64_secret", Attribute::bool().default_value(false)),
            (
                "lifetime_grace_period",
                Attribute::int64().default_value(0).validator(int_at_least(0)),
            ),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }

    fn from_api(value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let mut plugin: Self = default_from_api(value)?;
        if let Some(secret) = prior.and_then(|p| p.secret.clone()) {
            plugin.secret = Some(secret);
        }
        Ok(plugin)
    }
}
