//! Upstream health checks

use apisix_schema::validator::{each, int_at_least, int_between, one_of};
use apisix_schema::{attributes, Attribute, ElementKind};
use serde::{Deserialize, Serialize};

/// Active and passive health checks of an upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksModel {
    /// Checks sent by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveCheck>,
    /// Health judged from proxied traffic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passive: Option<PassiveCheck>,
}

/// Active health check settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveCheck {
    /// Check protocol
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    /// Check timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    /// Targets checked at the same time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<i64>,
    /// Path of HTTP checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    /// Host header of HTTP checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Port checked instead of the node port
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Verify the certificate of HTTPS checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_verify_certificate: Option<bool>,
    /// Extra headers of HTTP checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_headers: Option<Vec<String>>,
    /// When a node is considered healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<ActiveHealthy>,
    /// When a node is considered unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy: Option<ActiveUnhealthy>,
}

/// Active check thresholds for healthy nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveHealthy {
    /// Seconds between checks of healthy nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    /// Statuses counted as success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_statuses: Option<Vec<i64>>,
    /// Successes before a node is healthy again
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successes: Option<i64>,
}

/// Active check thresholds for unhealthy nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveUnhealthy {
    /// Seconds between checks of unhealthy nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<i64>,
    /// Statuses counted as failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_statuses: Option<Vec<i64>>,
    /// HTTP failures before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_failures: Option<i64>,
    /// TCP failures before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_failures: Option<i64>,
    /// Timeouts before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<i64>,
}

/// Passive health check settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveCheck {
    /// When a node is considered healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<PassiveHealthy>,
    /// When a node is considered unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy: Option<PassiveUnhealthy>,
}

/// Passive thresholds for healthy nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveHealthy {
    /// Statuses counted as success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_statuses: Option<Vec<i64>>,
    /// Successes before a node is healthy again
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successes: Option<i64>,
}

/// Passive thresholds for unhealthy nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassiveUnhealthy {
    /// Statuses counted as failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_statuses: Option<Vec<i64>>,
    /// HTTP failures before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_failures: Option<i64>,
    /// TCP failures before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_failures: Option<i64>,
    /// Timeouts before a node is unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<i64>,
}

/// Filled in by APISIX when left out, so the value read back is kept
fn http_statuses() -> Attribute {
    Attribute::list(ElementKind::Int64)
        .optional()
        .computed()
        .validator(each(int_between(200, 599)))
}

fn counter(default: i64, min: i64) -> Attribute {
    Attribute::int64()
        .default_value(default)
        .validator(int_between(min, 254))
}

/// `checks` attribute
pub fn checks_attribute() -> Attribute {
    let active = Attribute::single_nested(attributes([
        (
            "type",
            Attribute::string()
                .default_value("http")
                .validator(one_of(&["http", "https", "tcp"])),
        ),
        (
            "timeout",
            Attribute::int64().default_value(1).validator(int_at_least(0)),
        ),
        (
            "concurrency",
            Attribute::int64().default_value(10).validator(int_at_least(0)),
        ),
        ("http_path", Attribute::string().default_value("/")),
        ("host", Attribute::string().optional().computed()),
        (
            "port",
            Attribute::int64()
                .optional()
                .computed()
                .validator(int_between(1, 65535)),
        ),
        (
            "https_verify_certificate",
            Attribute::bool().default_value(true),
        ),
        ("req_headers", Attribute::list(ElementKind::String).optional()),
        (
            "healthy",
            Attribute::single_nested(attributes([
                (
                    "interval",
                    Attribute::int64().default_value(1).validator(int_at_least(1)),
                ),
                ("http_statuses", http_statuses()),
                ("successes", counter(2, 1)),
            ]))
            .optional(),
        ),
        (
            "unhealthy",
            Attribute::single_nested(attributes([
                (
                    "interval",
                    Attribute::int64().default_value(1).validator(int_at_least(1)),
                ),
                ("http_statuses", http_statuses()),
                ("http_failures", counter(5, 1)),
                ("tcp_failures", counter(2, 1)),
                ("timeouts", counter(3, 1)),
            ]))
            .optional(),
        ),
    ]))
    .optional();

    let passive = Attribute::single_nested(attributes([
        (
            "healthy",
            Attribute::single_nested(attributes([
                ("http_statuses", http_statuses()),
                ("successes", counter(5, 0)),
            ]))
            .optional(),
        ),
        (
            "unhealthy",
            Attribute::single_nested(attributes([
                ("http_statuses", http_statuses()),
                ("http_failures", counter(5, 0)),
                ("tcp_failures", counter(2, 0)),
                ("timeouts", counter(7, 0)),
            ]))
            .optional(),
        ),
    ]))
    .optional();

    Attribute::single_nested(attributes([("active", active), ("passive", passive)]))
        .optional()
        .description("Health checks of the upstream nodes.")
}
