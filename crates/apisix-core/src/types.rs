//! Shared vocabulary for APISIX Admin API objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods accepted by APISIX route matching
pub const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "CONNECT", "TRACE", "PURGE",
];

/// Kind of object managed through the Admin API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// `/routes`
    Route,
    /// `/services`
    Service,
    /// `/upstreams`
    Upstream,
    /// `/ssls`
    Ssl,
    /// `/consumers`
    Consumer,
    /// `/global_rules`
    GlobalRule,
    /// `/stream_routes`
    StreamRoute,
    /// `/plugin_metadata`
    PluginMetadata,
}

impl ObjectKind {
    /// Path segment below the Admin API prefix
    pub fn path_segment(&self) -> &'static str {
        match self {
            ObjectKind::Route => "routes",
            ObjectKind::Service => "services",
            ObjectKind::Upstream => "upstreams",
            ObjectKind::Ssl => "ssls",
            ObjectKind::Consumer => "consumers",
            ObjectKind::GlobalRule => "global_rules",
            ObjectKind::StreamRoute => "stream_routes",
            ObjectKind::PluginMetadata => "plugin_metadata",
        }
    }

    /// Consumers are written with `PUT /consumers` and identified by the
    /// `username` field of the body.
    pub fn id_in_body(&self) -> bool {
        matches!(self, ObjectKind::Consumer)
    }

    /// Body field holding the identity when [`ObjectKind::id_in_body`] is set
    pub fn id_field(&self) -> &'static str {
        match self {
            ObjectKind::Consumer => "username",
            _ => "id",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segments() {
        assert_eq!(ObjectKind::Ssl.path_segment(), "ssls");
        assert_eq!(ObjectKind::GlobalRule.to_string(), "global_rules");
        assert_eq!(ObjectKind::PluginMetadata.path_segment(), "plugin_metadata");
    }

    #[test]
    fn test_consumer_identity() {
        assert!(ObjectKind::Consumer.id_in_body());
        assert_eq!(ObjectKind::Consumer.id_field(), "username");
        assert!(!ObjectKind::Route.id_in_body());
    }
}
