//! `ip-restriction` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{conflicts_with, elements_greater_than};
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};

/// Accepts or rejects clients by IP address or CIDR range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpRestrictionPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Message returned to rejected clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Addresses allowed through
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<Vec<String>>,
    /// Addresses rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<Vec<String>>,
}

impl Plugin for IpRestrictionPlugin {
    const NAME: &'static str = "ip-restriction";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "whitelist",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_greater_than(0))
                    .validator(conflicts_with(&["blacklist"])),
            ),
            (
                "blacklist",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_greater_than(0))
                    .validator(conflicts_with(&["whitelist"])),
            ),
            (
                "message",
                Attribute::string().default_value("Your IP address is not allowed"),
            ),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}
