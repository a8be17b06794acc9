//! `gelf-udp-logger` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{int_at_least, int_between};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Sends request logs to a Graylog server over UDP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GelfUdpLoggerPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Graylog host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Graylog port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Logger identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Timeout of the UDP send in seconds
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
}

impl Plugin for GelfUdpLoggerPlugin {
    const NAME: &'static str = "gelf-udp-logger";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            ("host", Attribute::string().required()),
            (
                "port",
                Attribute::int64().required().validator(int_between(1, 65535)),
            ),
            ("name", Attribute::string().default_value("gelf udp logger")),
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
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}
