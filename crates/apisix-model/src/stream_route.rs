//! `apisix_stream_route`: L4 proxy rules

use crate::api_model::ApiModel;
use crate::convert::{get, get_int, put, JsonMap};
use crate::upstream::{inline_upstream_attribute, UpstreamModel};
use apisix_core::{ObjectKind, Result};
use apisix_schema::validator::{conflicts_with, int_between};
use apisix_schema::{attributes, Attribute, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stream route resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamRouteModel {
    /// Identifier assigned by APISIX
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// Client address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    /// Address APISIX listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_addr: Option<String>,
    /// Port APISIX listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_port: Option<i64>,
    /// TLS server name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    /// Upstream handling the connections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_id: Option<String>,
    /// Embedded upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamModel>,
}

impl ApiModel for StreamRouteModel {
    const KIND: ObjectKind = ObjectKind::StreamRoute;
    const TYPE_NAME: &'static str = "apisix_stream_route";

    fn schema() -> Schema {
        Schema::new(attributes([
            (
                "id",
                Attribute::string().computed().use_state_for_unknown(),
            ),
            ("desc", Attribute::string().optional()),
            ("remote_addr", Attribute::string().optional()),
            ("server_addr", Attribute::string().optional()),
            (
                "server_port",
                Attribute::int64().optional().validator(int_between(1, 65535)),
            ),
            ("sni", Attribute::string().optional()),
            (
                "upstream_id",
                Attribute::string()
                    .optional()
                    .validator(conflicts_with(&["upstream"])),
            ),
            ("upstream", inline_upstream_attribute()),
        ]))
        .description("Manages stream routes.")
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "desc", &self.desc)?;
        put(&mut out, "remote_addr", &self.remote_addr)?;
        put(&mut out, "server_addr", &self.server_addr)?;
        put(&mut out, "server_port", &self.server_port)?;
        put(&mut out, "sni", &self.sni)?;
        put(&mut out, "upstream_id", &self.upstream_id)?;
        if let Some(upstream) = &self.upstream {
            out.insert("upstream".to_string(), Value::Object(upstream.fields_to_api()?));
        }
        Ok(out)
    }

    fn from_api(id: &str, value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        Ok(Self {
            id: Some(id.to_string()),
            desc: get(value, "desc")?,
            remote_addr: get(value, "remote_addr")?,
            server_addr: get(value, "server_addr")?,
            server_port: get_int(value, "server_port")?,
            sni: get(value, "sni")?,
            upstream_id: get(value, "upstream_id")?,
            upstream: UpstreamModel::inline_from_api(
                value.get("upstream"),
                prior.and_then(|p| p.upstream.as_ref()),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_schema::validate_config;
    use serde_json::json;

    #[test]
    fn test_server_port_range() {
        let schema = StreamRouteModel::schema();
        assert!(validate_config(&schema, &json!({"server_port": 0})).has_error());
        assert!(validate_config(&schema, &json!({"server_port": 9100, "upstream_id": "1"})).is_empty());
    }

    #[test]
    fn test_inline_upstream_map_nodes() {
        let api = json!({
            "server_port": 9100,
            "upstream": {"type": "roundrobin", "nodes": {"10.0.0.1:6379": 1}}
        });
        let model = StreamRouteModel::from_api("5", api.as_object().unwrap(), None).unwrap();
        let upstream = model.upstream.unwrap();
        assert_eq!(upstream.nodes.unwrap()[0].port, 6379);
        assert_eq!(model.server_port, Some(9100));
    }
}
