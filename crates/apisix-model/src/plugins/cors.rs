//! `cors` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::int_at_least;
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};

/// Answers CORS preflight requests and decorates responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Comma separated origins, `*` for any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_origins: Option<String>,
    /// Comma separated methods, `*` for any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_methods: Option<String>,
    /// Comma separated request headers, `*` for any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_headers: Option<String>,
    /// Comma separated response headers exposed to the browser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expose_headers: Option<String>,
    /// Seconds a preflight result may be cached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    /// Allow credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_credential: Option<bool>,
    /// Regular expressions matched against the origin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_origins_by_regex: Option<Vec<String>>,
}

impl Plugin for CorsPlugin {
    const NAME: &'static str = "cors";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            ("allow_origins", Attribute::string().default_value("*")),
            ("allow_methods", Attribute::string().default_value("*")),
            ("allow_headers", Attribute::string().default_value("*")),
            ("expose_headers", Attribute::string().default_value("*")),
            (
                "max_age",
                Attribute::int64().default_value(5).validator(int_at_least(-1)),
            ),
            ("allow_credential", Attribute::bool().default_value(false)),
            (
                "allow_origins_by_regex",
                Attribute::list(ElementKind::String).optional(),
            ),
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
        Schema::new(attributes([("cors", CorsPlugin::schema())]))
    }

    #[test]
    fn test_defaults_planned() {
        let mut diags = Diagnostics::new();
        let planned = plan(&schema(), &json!({"cors": {}}), None, &mut diags);
        let plugin: CorsPlugin = serde_json::from_value(planned["cors"].clone()).unwrap();
        assert_eq!(plugin.allow_origins.as_deref(), Some("*"));
        assert_eq!(plugin.max_age, Some(5));
        assert_eq!(plugin.allow_credential, Some(false));
        assert_eq!(plugin.allow_origins_by_regex, None);
    }

    #[test]
    fn test_max_age_lower_bound() {
        assert!(validate_config(&schema(), &json!({"cors": {"max_age": -1}})).is_empty());
        assert!(validate_config(&schema(), &json!({"cors": {"max_age": -2}})).has_error());
    }
}
