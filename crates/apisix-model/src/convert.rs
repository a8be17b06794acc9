//! Helpers shared by the state and Admin API conversions

use apisix_core::{Error, Result};
use apisix_schema::{Diagnostics, ValidateRequest, Validator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

/// Untyped JSON object as sent to and received from the Admin API
pub type JsonMap = Map<String, Value>;

/// Read an optional field, failing when it has an unexpected type
pub fn get<T: DeserializeOwned>(map: &JsonMap, key: &str) -> Result<Option<T>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::conversion(key, e.to_string())),
    }
}

/// Read an optional integer, accepting integral floats
pub fn get_int(map: &JsonMap, key: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Some(i)),
            (None, Some(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
            _ => Err(Error::conversion(key, format!("expected an integer, got {n}"))),
        },
        Some(other) => Err(Error::conversion(
            key,
            format!("expected an integer, got {other}"),
        )),
    }
}

/// Write an optional field, skipping `None`
pub fn put<T: Serialize>(map: &mut JsonMap, key: &str, value: &Option<T>) -> Result<()> {
    if let Some(value) = value {
        map.insert(key.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

/// Parse an attribute holding a JSON document
pub fn parse_json_string(field: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| Error::conversion(field, format!("invalid JSON: {e}")))
}

/// Render an API value as a JSON string attribute.
///
/// The prior string is kept when it encodes the same document, so the
/// user's formatting does not show up as a change.
pub fn json_string_from_api(value: Option<&Value>, prior: Option<&str>) -> Result<Option<String>> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    if let Some(prior) = prior {
        if serde_json::from_str::<Value>(prior).is_ok_and(|p| &p == value) {
            return Ok(Some(prior.to_string()));
        }
    }
    Ok(Some(serde_json::to_string(value)?))
}

/// Write the `vars` JSON string attribute as the API array
pub fn vars_to_api(vars: &Option<String>, out: &mut JsonMap) -> Result<()> {
    if let Some(vars) = vars {
        let parsed = parse_json_string("vars", vars)?;
        if !parsed.is_array() {
            return Err(Error::conversion("vars", "expected a JSON array"));
        }
        out.insert("vars".to_string(), parsed);
    }
    Ok(())
}

/// Read the API `vars` array back into its JSON string attribute
pub fn vars_from_api(map: &JsonMap, prior: Option<&String>) -> Result<Option<String>> {
    json_string_from_api(map.get("vars"), prior.map(String::as_str))
}

/// Disabled flag of a plugin, from `_meta.disable` or the legacy
/// top-level `disable` field
pub fn read_disable(plugin: &JsonMap) -> bool {
    plugin
        .get("_meta")
        .and_then(|meta| meta.get("disable"))
        .or_else(|| plugin.get("disable"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Write the disabled flag of a plugin under `_meta`
pub fn write_disable(plugin: &mut JsonMap, disable: bool) {
    let meta = plugin
        .entry("_meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(meta) = meta {
        meta.insert("disable".to_string(), Value::Bool(disable));
    }
}

/// Kind of document a JSON string attribute must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    /// `[...]`
    Array,
    /// `{...}`
    Object,
}

/// Validates that a string attribute holds a JSON document of some kind
#[derive(Debug, Clone)]
pub struct JsonString {
    kind: JsonKind,
}

/// String must be a JSON array
pub fn json_array() -> JsonString {
    JsonString {
        kind: JsonKind::Array,
    }
}

/// String must be a JSON object
pub fn json_object() -> JsonString {
    JsonString {
        kind: JsonKind::Object,
    }
}

impl Validator for JsonString {
    fn description(&self) -> String {
        match self.kind {
            JsonKind::Array => "value must be a JSON array".to_string(),
            JsonKind::Object => "value must be a JSON object".to_string(),
        }
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(text) = req.value.as_str() else {
            return;
        };
        let ok = match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(_)) => self.kind == JsonKind::Array,
            Ok(Value::Object(_)) => self.kind == JsonKind::Object,
            Ok(_) => false,
            Err(e) => {
                diags.add_attribute_error(
                    req.path.clone(),
                    "Invalid JSON String",
                    format!("Attribute {} is not valid JSON: {e}", req.path),
                );
                return;
            }
        };
        if !ok {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid JSON String",
                format!("Attribute {} {}", req.path, self.description()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_schema::AttributePath;
    use serde_json::json;

    fn object(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_reports_field() {
        let map = object(json!({"name": 42}));
        let err = get::<String>(&map, "name").unwrap_err();
        assert!(matches!(err, Error::Conversion { ref field, .. } if field == "name"));
        assert_eq!(get::<String>(&map, "missing").unwrap(), None);
    }

    #[test]
    fn test_get_int_accepts_integral_float() {
        let map = object(json!({"a": 3, "b": 3.0, "c": 3.5, "d": "3"}));
        assert_eq!(get_int(&map, "a").unwrap(), Some(3));
        assert_eq!(get_int(&map, "b").unwrap(), Some(3));
        assert!(get_int(&map, "c").is_err());
        assert!(get_int(&map, "d").is_err());
    }

    #[test]
    fn test_vars_keep_prior_formatting() {
        let prior = r#"[ ["arg_name", "==", "json"] ]"#.to_string();
        let map = object(json!({"vars": [["arg_name", "==", "json"]]}));
        assert_eq!(vars_from_api(&map, Some(&prior)).unwrap(), Some(prior));

        let changed = object(json!({"vars": [["arg_name", "==", "xml"]]}));
        let out = vars_from_api(&changed, Some(&r#"[["arg_name","==","json"]]"#.to_string()))
            .unwrap()
            .unwrap();
        assert_eq!(out, r#"[["arg_name","==","xml"]]"#);
    }

    #[test]
    fn test_vars_to_api_requires_array() {
        let mut out = JsonMap::new();
        vars_to_api(&Some(r#"[["http_x", "==", "1"]]"#.to_string()), &mut out).unwrap();
        assert!(out["vars"].is_array());
        assert!(vars_to_api(&Some("{}".to_string()), &mut JsonMap::new()).is_err());
        assert!(vars_to_api(&Some("not json".to_string()), &mut JsonMap::new()).is_err());
    }

    #[test]
    fn test_disable_meta_and_legacy() {
        let mut plugin = JsonMap::new();
        assert!(!read_disable(&plugin));
        write_disable(&mut plugin, true);
        assert_eq!(Value::Object(plugin.clone()), json!({"_meta": {"disable": true}}));
        assert!(read_disable(&plugin));

        let legacy = object(json!({"disable": true}));
        assert!(read_disable(&legacy));
    }

    #[test]
    fn test_json_string_validator() {
        let path = AttributePath::root().attribute("vars");
        let parent = JsonMap::new();
        let check = |validator: &JsonString, text: &str| {
            let value = json!(text);
            let mut diags = Diagnostics::new();
            validator.validate(
                &ValidateRequest {
                    path: &path,
                    value: &value,
                    parent: &parent,
                },
                &mut diags,
            );
            diags.has_error()
        };
        assert!(!check(&json_array(), "[]"));
        assert!(check(&json_array(), "{}"));
        assert!(check(&json_object(), "nope"));
        assert!(!check(&json_object(), r#"{"a": 1}"#));
    }
}
