//! `serverless-post-function` plugin

use super::serverless_pre_function::serverless_schema;
use super::Plugin;
use apisix_schema::Attribute;
use serde::{Deserialize, Serialize};

/// Runs Lua functions at the end of a phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerlessPostFunctionPlugin {
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

impl Plugin for ServerlessPostFunctionPlugin {
    const NAME: &'static str = "serverless-post-function";

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
    use apisix_schema::{attributes, plan, validate_config, Diagnostics, Schema};
    use serde_json::json;

    #[test]
    fn test_shares_serverless_schema() {
        let schema = Schema::new(attributes([(
            "serverless_post_function",
            ServerlessPostFunctionPlugin::schema(),
        )]));
        let mut diags = Diagnostics::new();
        let planned = plan(
            &schema,
            &json!({"serverless_post_function": {"functions": ["return function() end"]}}),
            None,
            &mut diags,
        );
        assert_eq!(planned["serverless_post_function"]["phase"], json!("access"));

        let bad = json!({"serverless_post_function": {"phase": "init", "functions": ["f"]}});
        assert!(validate_config(&schema, &bad).has_error());
    }
}
