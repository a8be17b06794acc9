//! `apisix_upstream`: a set of backend nodes plus load balancing settings

use crate::api_model::ApiModel;
use crate::convert::{get, get_int, put, JsonMap};
use crate::timeout::{timeout_attribute, TimeoutModel};
use crate::upstream_checks::{checks_attribute, ChecksModel};
use apisix_core::{Error, ObjectKind, Result};
use apisix_schema::validator::{
    conflicting, conflicts_with, int_at_least, int_between, one_of_case_insensitive,
    required_together, requires_when,
};
use apisix_schema::{attributes, Attribute, Attributes, ElementKind, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Upstream, standalone or embedded in a route, service or stream route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamModel {
    /// Identifier, absent for embedded upstreams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Load balancing algorithm
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub balancer: Option<String>,
    /// Service name used for service discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Service discovery type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_type: Option<String>,
    /// Timeouts towards the nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutModel>,
    /// Name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// How the `Host` header is forwarded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_host: Option<String>,
    /// Protocol used towards the nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Retries on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    /// Seconds during which retries may happen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_timeout: Option<i64>,
    /// Labels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Host sent when `pass_host` is `rewrite`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_host: Option<String>,
    /// What `chash` hashes on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_on: Option<String>,
    /// Hash key for `chash`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Connection pool towards the nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keepalive_pool: Option<KeepalivePoolModel>,
    /// SSL object holding the client certificate for mTLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_client_cert_id: Option<String>,
    /// Inline client certificate for mTLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<UpstreamTlsModel>,
    /// Health checks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ChecksModel>,
    /// Backend nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeModel>>,
}

/// Backend node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeModel {
    /// Host name or address
    pub host: String,
    /// Port
    pub port: i64,
    /// Load balancing weight
    #[serde(default = "default_weight")]
    pub weight: i64,
}

fn default_weight() -> i64 {
    1
}

/// Upstream connection pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepalivePoolModel {
    /// Idle connections kept per worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Seconds before an idle connection is closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<i64>,
    /// Requests served by a connection before it is closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<i64>,
}

/// Client certificate presented to the nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamTlsModel {
    /// PEM certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<String>,
    /// PEM private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}

/// Attributes shared by standalone and embedded upstreams
pub fn upstream_attributes() -> Attributes {
    attributes([
        (
            "type",
            Attribute::string()
                .default_value("roundrobin")
                .validator(one_of_case_insensitive(&[
                    "roundrobin",
                    "chash",
                    "ewma",
                    "least_conn",
                ]))
                .validator(requires_when("chash", "key"))
                .description("Load balancing algorithm, `roundrobin` by default."),
        ),
        (
            "service_name",
            Attribute::string()
                .optional()
                .description("Service name used for service discovery. Can't be used with `nodes`."),
        ),
        (
            "discovery_type",
            Attribute::string()
                .optional()
                .description("The type of service discovery."),
        ),
        ("timeout", timeout_attribute()),
        ("name", Attribute::string().optional()),
        ("desc", Attribute::string().optional()),
        (
            "pass_host",
            Attribute::string()
                .default_value("pass")
                .validator(one_of_case_insensitive(&["pass", "node", "rewrite"]))
                .validator(requires_when("rewrite", "upstream_host")),
        ),
        (
            "scheme",
            Attribute::string()
                .default_value("http")
                .validator(one_of_case_insensitive(&[
                    "http", "https", "grpc", "grpcs", "tcp", "udp", "tls",
                ])),
        ),
        (
            "retries",
            Attribute::int64().optional().validator(int_at_least(0)),
        ),
        (
            "retry_timeout",
            Attribute::int64().optional().validator(int_at_least(0)),
        ),
        ("labels", Attribute::map(ElementKind::String).optional()),
        ("upstream_host", Attribute::string().optional()),
        (
            "hash_on",
            Attribute::string()
                .default_value("vars")
                .validator(one_of_case_insensitive(&[
                    "vars",
                    "header",
                    "cookie",
                    "consumer",
                    "vars_combinations",
                ])),
        ),
        ("key", Attribute::string().optional()),
        (
            "keepalive_pool",
            Attribute::single_nested(attributes([
                (
                    "size",
                    Attribute::int64().default_value(320).validator(int_at_least(1)),
                ),
                (
                    "idle_timeout",
                    Attribute::int64().default_value(60).validator(int_at_least(0)),
                ),
                (
                    "requests",
                    Attribute::int64().default_value(1000).validator(int_at_least(1)),
                ),
            ]))
            .optional(),
        ),
        (
            "tls_client_cert_id",
            Attribute::string()
                .optional()
                .validator(conflicts_with(&["tls"]))
                .description("Id of the SSL object holding the client certificate."),
        ),
        (
            "tls",
            Attribute::single_nested(attributes([
                ("client_cert", Attribute::string().required()),
                ("client_key", Attribute::string().required().sensitive()),
            ]))
            .optional()
            .validator(conflicts_with(&["tls_client_cert_id"])),
        ),
        ("checks", checks_attribute()),
        (
            "nodes",
            Attribute::list_nested(attributes([
                ("host", Attribute::string().required()),
                (
                    "port",
                    Attribute::int64().required().validator(int_between(1, 65535)),
                ),
                (
                    "weight",
                    Attribute::int64().default_value(1).validator(int_at_least(0)),
                ),
            ]))
            .optional(),
        ),
    ])
}

/// `upstream` attribute of routes, services and stream routes
pub fn inline_upstream_attribute() -> Attribute {
    Attribute::single_nested(upstream_attributes())
        .optional()
        .validator(conflicts_with(&["upstream_id"]))
        .description("Upstream embedded in the object.")
}

impl UpstreamModel {
    /// Upstream fields as sent to the Admin API, without the identifier
    pub fn fields_to_api(&self) -> Result<JsonMap> {
        let mut out = JsonMap::new();
        put(&mut out, "type", &self.balancer)?;
        put(&mut out, "service_name", &self.service_name)?;
        put(&mut out, "discovery_type", &self.discovery_type)?;
        put(&mut out, "timeout", &self.timeout)?;
        put(&mut out, "name", &self.name)?;
        put(&mut out, "desc", &self.desc)?;
        put(&mut out, "pass_host", &self.pass_host)?;
        put(&mut out, "scheme", &self.scheme)?;
        put(&mut out, "retries", &self.retries)?;
        put(&mut out, "retry_timeout", &self.retry_timeout)?;
        put(&mut out, "labels", &self.labels)?;
        put(&mut out, "upstream_host", &self.upstream_host)?;
        put(&mut out, "hash_on", &self.hash_on)?;
        put(&mut out, "key", &self.key)?;
        put(&mut out, "keepalive_pool", &self.keepalive_pool)?;
        put(&mut out, "checks", &self.checks)?;
        put(&mut out, "nodes", &self.nodes)?;

        if let Some(cert_id) = &self.tls_client_cert_id {
            out.insert(
                "tls".to_string(),
                serde_json::json!({ "client_cert_id": cert_id }),
            );
        } else {
            put(&mut out, "tls", &self.tls)?;
        }
        Ok(out)
    }

    /// Upstream fields read from the Admin API, without the identifier
    pub fn fields_from_api(value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let tls = value.get("tls").and_then(Value::as_object);
        let tls_client_cert_id = tls
            .and_then(|tls| tls.get("client_cert_id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let tls = match (tls, &tls_client_cert_id) {
            (Some(tls), None) => {
                let mut model = UpstreamTlsModel {
                    client_cert: get(tls, "client_cert")?,
                    client_key: get(tls, "client_key")?,
                };
                // APISIX returns the key encrypted
                let prior_key = prior
                    .and_then(|p| p.tls.as_ref())
                    .and_then(|t| t.client_key.clone());
                if prior_key.is_some() {
                    model.client_key = prior_key;
                }
                Some(model)
            }
            _ => None,
        };

        Ok(Self {
            id: None,
            balancer: get(value, "type")?,
            service_name: get(value, "service_name")?,
            discovery_type: get(value, "discovery_type")?,
            timeout: get(value, "timeout")?,
            name: get(value, "name")?,
            desc: get(value, "desc")?,
            pass_host: get(value, "pass_host")?,
            scheme: get(value, "scheme")?,
            retries: get_int(value, "retries")?,
            retry_timeout: get_int(value, "retry_timeout")?,
            labels: get(value, "labels")?,
            upstream_host: get(value, "upstream_host")?,
            hash_on: get(value, "hash_on")?,
            key: get(value, "key")?,
            keepalive_pool: get(value, "keepalive_pool")?,
            tls_client_cert_id,
            tls,
            checks: get(value, "checks")?,
            nodes: nodes_from_api(value.get("nodes"), prior.and_then(|p| p.nodes.as_deref()))?,
        })
    }

    /// Embedded upstream of a route, service or stream route
    pub fn inline_from_api(value: Option<&Value>, prior: Option<&Self>) -> Result<Option<Self>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(upstream)) => Self::fields_from_api(upstream, prior).map(Some),
            Some(_) => Err(Error::conversion("upstream", "expected an object")),
        }
    }
}

/// Nodes come back either as a list of objects or as a
/// `"host:port": weight` map. The prior order is kept for nodes that are
/// still present.
fn nodes_from_api(value: Option<&Value>, prior: Option<&[NodeModel]>) -> Result<Option<Vec<NodeModel>>> {
    let mut nodes = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(list @ Value::Array(_)) => serde_json::from_value::<Vec<NodeModel>>(list.clone())
            .map_err(|e| Error::conversion("nodes", e.to_string()))?,
        Some(Value::Object(map)) => map
            .iter()
            .map(|(address, weight)| node_from_address(address, weight))
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(Error::conversion("nodes", "expected a list or a map")),
    };

    if let Some(prior) = prior {
        let position = |node: &NodeModel| {
            prior
                .iter()
                .position(|p| p.host == node.host && p.port == node.port)
                .unwrap_or(usize::MAX)
        };
        nodes.sort_by_key(|node| position(node));
    }
    Ok(Some(nodes))
}

fn node_from_address(address: &str, weight: &Value) -> Result<NodeModel> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| Error::conversion("nodes", format!("missing port in node '{address}'")))?;
    let port = port
        .parse::<i64>()
        .map_err(|_| Error::conversion("nodes", format!("invalid port in node '{address}'")))?;
    let weight = weight
        .as_i64()
        .ok_or_else(|| Error::conversion("nodes", format!("invalid weight for node '{address}'")))?;
    Ok(NodeModel {
        host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
        port,
        weight,
    })
}

impl ApiModel for UpstreamModel {
    const KIND: ObjectKind = ObjectKind::Upstream;
    const TYPE_NAME: &'static str = "apisix_upstream";

    fn schema() -> Schema {
        let mut attributes = upstream_attributes();
        attributes.insert(
            "id".to_string(),
            Attribute::string()
                .computed()
                .use_state_for_unknown()
                .description("Identifier of the upstream."),
        );
        Schema::new(attributes)
            .validator(conflicting(&["service_name", "nodes"]))
            .validator(required_together(&["service_name", "discovery_type"]))
            .description("Manages upstreams.")
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn to_api(&self) -> Result<JsonMap> {
        self.fields_to_api()
    }

    fn from_api(id: &str, value: &JsonMap, prior: Option<&Self>) -> Result<Self> {
        let mut model = Self::fields_from_api(value, prior)?;
        model.id = Some(id.to_string());
        Ok(model)
    }
}
