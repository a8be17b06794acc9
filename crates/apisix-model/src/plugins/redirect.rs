//! `redirect` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{conflicts_with, elements_at_least, elements_at_most, int_between};
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};

/// Answers requests with a redirect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Redirect target, may contain Nginx variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Regex and replacement template for the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_uri: Option<Vec<String>>,
    /// Redirect status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ret_code: Option<i64>,
    /// Redirect HTTP requests to HTTPS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_to_https: Option<bool>,
    /// Escape the target URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode_uri: Option<bool>,
    /// Keep the query string of the original request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append_query_string: Option<bool>,
}

impl Plugin for RedirectPlugin {
    const NAME: &'static str = "redirect";

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
                "ret_code",
                Attribute::int64()
                    .default_value(302)
                    .validator(int_between(200, 599)),
            ),
            ("http_to_https", Attribute::bool().default_value(false)),
            ("encode_uri", Attribute::bool().default_value(false)),
            ("append_query_string", Attribute::bool().default_value(false)),
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
    use apisix_schema::{plan, validate_config, Diagnostics, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(attributes([("redirect", RedirectPlugin::schema())]))
    }

    #[test]
    fn test_regex_uri_needs_pattern_and_template() {
        let ok = json!({"redirect": {"regex_uri": ["^/old/(.*)", "/new/$1"]}});
        assert!(validate_config(&schema(), &ok).is_empty());

        let short = json!({"redirect": {"regex_uri": ["^/old/(.*)"]}});
        assert_eq!(validate_config(&schema(), &short).error_count(), 1);

        let long = json!({"redirect": {"regex_uri": ["a", "b", "c"]}});
        assert_eq!(validate_config(&schema(), &long).error_count(), 1);
    }

    #[test]
    fn test_uri_conflicts_with_regex_uri() {
        let config = json!({"redirect": {"uri": "/new", "regex_uri": ["^/old", "/new"]}});
        // reported on both attributes
        assert_eq!(validate_config(&schema(), &config).error_count(), 2);
    }

    #[test]
    fn test_defaults_and_ret_code_range() {
        let mut diags = Diagnostics::new();
        let planned = plan(&schema(), &json!({"redirect": {"http_to_https": true}}), None, &mut diags);
        assert_eq!(planned["redirect"]["ret_code"], json!(302));
        assert_eq!(planned["redirect"]["append_query_string"], json!(false));

        let config = json!({"redirect": {"uri": "/x", "ret_code": 600}});
        assert!(validate_config(&schema(), &config).has_error());
    }
}
