//! `serverless-pre-function` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{elements_at_least, one_of};
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};

/// Request phases a serverless function can run in
pub(crate) const PHASES: &[&str] = &[
    "rewrite",
    "access",
    "header_filter",
    "body_filter",
    "log",
    "balancer",
];

/// Runs Lua functions at the beginning of a phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerlessPreFunctionPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Phase the functions run in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Lua functions, run in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<String>>,
}

/// Schema shared by both serverless plugins
pub(crate) fn serverless_schema() -> Attribute {
    Attribute::single_nested(attributes([
        ("disable", disable_attribute()),
        (
            "phase",
            Attribute::string()
                .default_value("access")
                .validator(one_of(PHASES)),
        ),
        (
            "functions",
            Attribute::list(ElementKind::String)
                .required()
                .validator(elements_at_least(1)),
        ),
    ]))
    .optional()
}

impl Plugin for ServerlessPreFunctionPlugin {
    const NAME: &'static str = "serverless-pre-function";

    fn schema() -> Attribute {
        serverless_schema()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_schema::{validate_config, Schema};
    use serde_json::json;

    #[test]
    fn test_phase_validation() {
        let schema = Schema::new(attributes([(
            "serverless_pre_function",
            ServerlessPreFunctionPlugin::schema(),
        )]));
        let ok = json!({"serverless_pre_function": {"phase": "rewrite", "functions": ["return function() end"]}});
        assert!(validate_config(&schema, &ok).is_empty());

        let bad = json!({"serverless_pre_function": {"phase": "init", "functions": []}});
        assert_eq!(validate_config(&schema, &bad).error_count(), 2);
    }
}
