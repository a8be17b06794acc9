//! Admin API response envelopes
//!
//! APISIX 3 answers with `{"key": .., "value": {..}}` for single objects
//! and `{"total": n, "list": [..]}` for collections. APISIX 2 wraps both in
//! a `node` object, with collections under `node.nodes`.

use crate::api::ApiObject;
use apisix_core::{Error, ObjectKind, Result};
use serde_json::{Map, Value};

/// Object from a single-object response
pub(crate) fn parse_object(kind: ObjectKind, body: &Value) -> Result<ApiObject> {
    let entry = body.get("node").unwrap_or(body);
    object_from_entry(kind, entry)
}

/// Objects from a collection response
pub(crate) fn parse_list(kind: ObjectKind, body: &Value) -> Result<Vec<ApiObject>> {
    let entries = match (body.get("list"), body.get("node")) {
        (Some(list), _) => list,
        (None, Some(node)) => node.get("nodes").unwrap_or(&Value::Null),
        (None, None) => &Value::Null,
    };
    match entries {
        Value::Array(entries) => entries
            .iter()
            .map(|entry| object_from_entry(kind, entry))
            .collect(),
        // Empty collections come back as `{}` or `null` depending on the version
        Value::Object(map) if map.is_empty() => Ok(Vec::new()),
        Value::Null => Ok(Vec::new()),
        other => Err(Error::conversion(
            kind.path_segment(),
            format!("unexpected list payload: {other}"),
        )),
    }
}

fn object_from_entry(kind: ObjectKind, entry: &Value) -> Result<ApiObject> {
    let value = match entry.get("value") {
        Some(Value::Object(value)) => value.clone(),
        Some(other) => {
            return Err(Error::conversion(
                kind.path_segment(),
                format!("expected an object value, got {other}"),
            ))
        }
        None => {
            return Err(Error::conversion(
                kind.path_segment(),
                "response has no value",
            ))
        }
    };
    let key = entry.get("key").and_then(Value::as_str);
    let id = object_id(kind, &value, key).ok_or_else(|| {
        Error::conversion(kind.path_segment(), "unable to determine the object id")
    })?;
    Ok(ApiObject { id, value })
}

/// Identifier from the `id` field (string or number), the identity field of
/// consumers, or the last segment of the etcd key.
fn object_id(kind: ObjectKind, value: &Map<String, Value>, key: Option<&str>) -> Option<String> {
    let field = value.get(kind.id_field()).or_else(|| value.get("id"));
    match field {
        Some(Value::String(id)) if !id.is_empty() => return Some(id.clone()),
        Some(Value::Number(id)) => return Some(id.to_string()),
        _ => {}
    }
    key.and_then(|key| key.rsplit('/').next())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// `error_msg` of an error response, or the raw body
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error_msg").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v3_object() {
        let body = json!({"key": "/apisix/routes/1", "value": {"id": "1", "uri": "/a"}});
        let object = parse_object(ObjectKind::Route, &body).unwrap();
        assert_eq!(object.id, "1");
        assert_eq!(object.value["uri"], json!("/a"));
    }

    #[test]
    fn test_v2_object_with_numeric_id() {
        let body = json!({
            "action": "get",
            "node": {"key": "/apisix/upstreams/7", "value": {"id": 7, "type": "roundrobin"}}
        });
        assert_eq!(parse_object(ObjectKind::Upstream, &body).unwrap().id, "7");
    }

    #[test]
    fn test_id_from_key_and_username() {
        let body = json!({"key": "/apisix/plugin_metadata/http-logger", "value": {"log_format": {}}});
        assert_eq!(
            parse_object(ObjectKind::PluginMetadata, &body).unwrap().id,
            "http-logger"
        );

        let body = json!({"key": "/apisix/consumers/jack", "value": {"username": "jack"}});
        assert_eq!(parse_object(ObjectKind::Consumer, &body).unwrap().id, "jack");
    }

    #[test]
    fn test_lists() {
        let v3 = json!({"total": 2, "list": [
            {"key": "/apisix/routes/1", "value": {"id": "1"}},
            {"key": "/apisix/routes/2", "value": {"id": "2"}}
        ]});
        assert_eq!(parse_list(ObjectKind::Route, &v3).unwrap().len(), 2);

        let v2 = json!({"node": {"dir": true, "key": "/apisix/routes", "nodes": [
            {"key": "/apisix/routes/1", "value": {"id": "1"}}
        ]}});
        assert_eq!(parse_list(ObjectKind::Route, &v2).unwrap().len(), 1);

        let empty = json!({"total": 0, "list": {}});
        assert!(parse_list(ObjectKind::Route, &empty).unwrap().is_empty());
        let empty_v2 = json!({"node": {"dir": true, "key": "/apisix/routes"}});
        assert!(parse_list(ObjectKind::Route, &empty_v2).unwrap().is_empty());
    }

    #[test]
    fn test_missing_value() {
        assert!(parse_object(ObjectKind::Route, &json!({"key": "/apisix/routes/1"})).is_err());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error_msg":"invalid configuration"}"#),
            "invalid configuration"
        );
        assert_eq!(error_message("bad gateway\n"), "bad gateway");
    }
}
