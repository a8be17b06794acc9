//! `proxy-rewrite` plugin

use super::{disable_attribute, Plugin};
use apisix_core::HTTP_METHODS;
use apisix_schema::validator::{conflicts_with, elements_at_least, elements_at_most, one_of};
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rewrites the request forwarded to the upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyRewritePlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// New upstream path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Regex and replacement template for the path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_uri: Option<Vec<String>>,
    /// New request method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// New `Host` header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Headers to set, an empty value removes the header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Send the original path to the upstream as is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_real_request_uri_unsafe: Option<bool>,
}

impl Plugin for ProxyRewritePlugin {
    const NAME: &'static str = "proxy-rewrite";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "uri",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["regex_uri"])),
            ),
            (
                "regex_uri",
                Attribute::list(ElementKind::String)
                    .optional()
                    .validator(elements_at_least(2))
                    .validator(elements_at_most(2))
                    .validator(conflicts_with(&["uri"])),
            ),
            (
                "method",
                Attribute::string().optional().validator(one_of(HTTP_METHODS)),
            ),
            ("host", Attribute::string().optional()),
            ("headers", Attribute::map(ElementKind::String).optional()),
            (
                "use_real_request_uri_unsafe",
                Attribute::bool().default_value(false),
            ),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}
