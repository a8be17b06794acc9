//! `http-logger` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{int_at_least, one_of};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Pushes request logs to an HTTP or HTTPS server in batches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpLoggerPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// URI of the log server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Authorization header sent to the log server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_header: Option<String>,
    /// Logger identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Seconds to keep the connection alive after a request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Maximum number of entries per batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_max_size: Option<i64>,
    /// Seconds before an idle buffer is flushed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_timeout: Option<i64>,
    /// Maximum age in seconds of the oldest entry of a batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_duration: Option<i64>,
    /// Retries before a batch is dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retry_count: Option<i64>,
    /// Seconds between retries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<i64>,
    /// Include the request body in log entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_req_body: Option<bool>,
    /// How pending entries are joined: `json` or `new_line`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat_method: Option<String>,
}

impl Plugin for HttpLoggerPlugin {
    const NAME: &'static str = "http-logger";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "uri",
                Attribute::string()
                    .required()
                    .description("The URI of the HTTP/HTTPS server."),
            ),
            (
                "auth_header",
                Attribute::string()
                    .default_value("")
                    .description("Any authorization headers."),
            ),
            (
                "name",
                Attribute::string()
                    .default_value("http logger")
                    .description("A unique identifier to identity the logger."),
            ),
            (
                "timeout",
                Attribute::int64().default_value(3).validator(int_at_least(1)),
            ),
            (
                "batch_max_size",
                Attribute::int64()
                    .default_value(1000)
                    .validator(int_at_least(1)),
            ),
            (
                "inactive_timeout",
                Attribute::int64().default_value(5).validator(int_at_least(1)),
            ),
            (
                "buffer_duration",
                Attribute::int64().default_value(60).validator(int_at_least(1)),
            ),
            (
                "max_retry_count",
                Attribute::int64().default_value(0).validator(int_at_least(0)),
            ),
            (
                "retry_delay",
                Attribute::int64().default_value(1).validator(int_at_least(0)),
            ),
            ("include_req_body", Attribute::bool().default_value(false)),
            (
                "concat_method",
                Attribute::string()
                    .default_value("json")
                    .validator(one_of(&["json", "new_line"])),
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
        Schema::new(attributes([("http_logger", HttpLoggerPlugin::schema())]))
    }

    #[test]
    fn test_defaults_planned() {
        let mut diags = Diagnostics::new();
        let planned = plan(
            &schema(),
            &json!({"http_logger": {"uri": "http://logs:9000"}}),
            None,
            &mut diags,
        );
        let plugin: HttpLoggerPlugin =
            serde_json::from_value(planned["http_logger"].clone()).unwrap();
        assert_eq!(plugin.disable, Some(false));
        assert_eq!(plugin.name.as_deref(), Some("http logger"));
        assert_eq!(plugin.timeout, Some(3));
        assert_eq!(plugin.batch_max_size, Some(1000));
        assert_eq!(plugin.concat_method.as_deref(), Some("json"));
    }

    #[test]
    fn test_validation() {
        let diags = validate_config(
            &schema(),
            &json!({"http_logger": {"uri": "http://logs", "timeout": 0, "concat_method": "csv"}}),
        );
        assert_eq!(diags.error_count(), 2, "{diags}");

        let diags = validate_config(&schema(), &json!({"http_logger": {}}));
        assert!(diags.has_error());
    }

    #[test]
    fn test_api_round_trip_keeps_fields() {
        let api = json!({
            "uri": "http://logs:9000",
            "batch_max_size": 10,
            "_meta": {"disable": true}
        });
        let plugin = HttpLoggerPlugin::from_api(api.as_object().unwrap(), None).unwrap();
        assert!(plugin.disabled());
        assert_eq!(plugin.batch_max_size, Some(10));
        assert_eq!(serde_json::Value::Object(plugin.to_api().unwrap()), api);
    }
}
