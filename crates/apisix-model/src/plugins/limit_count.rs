//! `limit-count` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::validator::{int_at_least, int_between, one_of, requires_when};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Limits the number of requests per client within a time window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitCountPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Requests allowed per window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    /// Window length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<i64>,
    /// How `key` is interpreted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Key requests are counted by
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Status returned when the limit is exceeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_code: Option<i64>,
    /// Body returned when the limit is exceeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_msg: Option<String>,
    /// Where counters are kept: `local` or `redis`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Let requests through when the counter store fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_degradation: Option<bool>,
    /// Add `X-RateLimit-*` headers to responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_limit_quota_header: Option<bool>,
    /// Share the counter between routes of the same group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Redis host for the `redis` policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_host: Option<String>,
    /// Redis port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_port: Option<i64>,
    /// Redis password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_password: Option<String>,
    /// Redis database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_database: Option<i64>,
    /// Redis timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_timeout: Option<i64>,
}

impl Plugin for LimitCountPlugin {
    const NAME: &'static str = "limit-count";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "count",
                Attribute::int64().required().validator(int_at_least(1)),
            ),
            (
                "time_window",
                Attribute::int64().required().validator(int_at_least(1)),
            ),
            (
                "key_type",
                Attribute::string()
                    .default_value("var")
                    .validator(one_of(&["var", "var_combination", "constant"])),
            ),
            ("key", Attribute::string().default_value("remote_addr")),
            (
                "rejected_code",
                Attribute::int64()
                    .default_value(503)
                    .validator(int_between(200, 599)),
            ),
            ("rejected_msg", Attribute::string().optional()),
            (
                "policy",
                Attribute::string()
                    .default_value("local")
                    .validator(one_of(&["local", "redis"]))
                    .validator(requires_when("redis", "redis_host")),
            ),
            ("allow_degradation", Attribute::bool().default_value(false)),
            (
                "show_limit_quota_header",
                Attribute::bool().default_value(true),
            ),
            ("group", Attribute::string().optional()),
            ("redis_host", Attribute::string().optional()),
            (
                "redis_port",
                Attribute::int64()
                    .optional()
                    .validator(int_between(1, 65535)),
            ),
            ("redis_password", Attribute::string().optional().sensitive()),
            (
                "redis_database",
                Attribute::int64().optional().validator(int_at_least(0)),
            ),
            (
                "redis_timeout",
                Attribute::int64().optional().validator(int_at_least(1)),
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
    use apisix_schema::{validate_config, Schema};
    use serde_json::json;

    #[test]
    fn test_redis_policy_needs_host() {
        let schema = Schema::new(attributes([("limit_count", LimitCountPlugin::schema())]));
        let config = json!({"limit_count": {"count": 10, "time_window": 60, "policy": "redis"}});
        assert!(validate_config(&schema, &config).has_error());

        let config = json!({"limit_count": {
            "count": 10, "time_window": 60, "policy": "redis", "redis_host": "127.0.0.1"
        }});
        assert!(validate_config(&schema, &config).is_empty());
    }
}
