//! Validation of a configuration object against a schema

use crate::attribute::{Attribute, AttributeKind, Attributes, Schema};
use crate::diagnostics::Diagnostics;
use crate::is_unknown;
use crate::path::AttributePath;
use crate::validator::ValidateRequest;
use serde_json::{Map, Value};

/// Validate `config` against `schema`.
///
/// Reports unsupported and missing arguments, values set on read-only
/// attributes and type mismatches, then runs every attribute validator on
/// known values and finally the schema level validators.
pub fn validate_config(schema: &Schema, config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let root = AttributePath::root();

    let empty = Map::new();
    let object = match config {
        Value::Object(object) => object,
        Value::Null => &empty,
        other => {
            diags.add_error(
                "Invalid configuration",
                format!("expected an object, got {}", type_name(other)),
            );
            return diags;
        }
    };

    validate_object(&schema.attributes, object, &root, &mut diags);
    for validator in &schema.validators {
        validator.validate(&root, object, &mut diags);
    }

    tracing::trace!(
        diagnostics = diags.len(),
        errors = diags.error_count(),
        "Configuration validated"
    );
    diags
}

fn validate_object(
    attributes: &Attributes,
    object: &Map<String, Value>,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    for name in object.keys() {
        if !attributes.contains_key(name) {
            diags.add_attribute_error(
                path.attribute(name),
                "Unsupported argument",
                format!("An argument named \"{name}\" is not expected here"),
            );
        }
    }

    for (name, attribute) in attributes {
        let path = path.attribute(name);
        let value = object.get(name).unwrap_or(&Value::Null);
        validate_attribute(attribute, value, object, &path, diags);
    }
}

fn validate_attribute(
    attribute: &Attribute,
    value: &Value,
    parent: &Map<String, Value>,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    if value.is_null() {
        if attribute.required {
            diags.add_attribute_error(
                path.clone(),
                "Missing required argument",
                format!("The argument \"{path}\" is required, but no definition was found"),
            );
        }
        return;
    }

    if !attribute.is_configurable() {
        diags.add_attribute_error(
            path.clone(),
            "Invalid Configuration for Read-Only Attribute",
            format!("Cannot set value for attribute \"{path}\", it is computed by the provider"),
        );
        return;
    }

    if is_unknown(value) {
        return;
    }

    if !check_kind(&attribute.kind, value, path, diags) {
        return;
    }

    for validator in &attribute.validators {
        validator.validate(
            &ValidateRequest {
                path,
                value,
                parent,
            },
            diags,
        );
    }

    match (&attribute.kind, value) {
        (AttributeKind::SingleNested(nested), Value::Object(object)) => {
            validate_object(nested, object, path, diags);
        }
        (AttributeKind::ListNested(nested), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(object) = item {
                    validate_object(nested, object, &path.index(index), diags);
                }
            }
        }
        _ => {}
    }
}

fn check_kind(
    kind: &AttributeKind,
    value: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) -> bool {
    let ok = match (kind, value) {
        (AttributeKind::String, Value::String(_)) => true,
        (AttributeKind::Int64, v) => v.as_i64().is_some(),
        (AttributeKind::Number, Value::Number(_)) => true,
        (AttributeKind::Bool, Value::Bool(_)) => true,
        (AttributeKind::List(element), Value::Array(items)) => {
            return check_elements(
                items.iter().enumerate().map(|(i, v)| (path.index(i), v)),
                |v| element.matches(v),
                element.name(),
                diags,
            );
        }
        (AttributeKind::Map(element), Value::Object(entries)) => {
            return check_elements(
                entries.iter().map(|(k, v)| (path.key(k), v)),
                |v| element.matches(v),
                element.name(),
                diags,
            );
        }
        (AttributeKind::SingleNested(_), Value::Object(_)) => true,
        (AttributeKind::ListNested(_), Value::Array(items)) => {
            return check_elements(
                items.iter().enumerate().map(|(i, v)| (path.index(i), v)),
                Value::is_object,
                "object",
                diags,
            );
        }
        _ => false,
    };

    if !ok {
        diags.add_attribute_error(
            path.clone(),
            "Incorrect attribute value type",
            format!(
                "Inappropriate value for attribute \"{path}\": {} required, got {}",
                kind.name(),
                type_name(value)
            ),
        );
    }
    ok
}

fn check_elements<'a>(
    elements: impl Iterator<Item = (AttributePath, &'a Value)>,
    matches: impl Fn(&Value) -> bool,
    expected: &str,
    diags: &mut Diagnostics,
) -> bool {
    let mut ok = true;
    for (path, value) in elements {
        if value.is_null() || is_unknown(value) || matches(value) {
            continue;
        }
        ok = false;
        diags.add_attribute_error(
            path.clone(),
            "Incorrect attribute value type",
            format!(
                "Inappropriate value for element \"{path}\": {expected} required, got {}",
                type_name(value)
            ),
        );
    }
    ok
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{attributes, ElementKind};
    use crate::validator::{conflicts_with, each, int_between, one_of, required_together};
    use serde_json::json;

    fn upstream_schema() -> Schema {
        Schema::new(attributes([
            ("id", Attribute::string().computed()),
            ("name", Attribute::string().optional()),
            (
                "type",
                Attribute::string()
                    .default_value("roundrobin")
                    .validator(one_of(&["roundrobin", "chash", "ewma", "least_conn"])),
            ),
            ("service_name", Attribute::string().optional()),
            ("discovery_type", Attribute::string().optional()),
            (
                "nodes",
                Attribute::list_nested(attributes([
                    ("host", Attribute::string().required()),
                    (
                        "port",
                        Attribute::int64().required().validator(int_between(1, 65535)),
                    ),
                    ("weight", Attribute::int64().default_value(1)),
                ]))
                .optional()
                .validator(conflicts_with(&["service_name"])),
            ),
            (
                "statuses",
                Attribute::list(ElementKind::Int64)
                    .optional()
                    .validator(each(int_between(200, 599))),
            ),
        ]))
        .validator(required_together(&["service_name", "discovery_type"]))
    }

    #[test]
    fn test_valid_config() {
        let config = json!({
            "name": "backend",
            "type": "chash",
            "nodes": [{"host": "127.0.0.1", "port": 8080}]
        });
        let diags = validate_config(&upstream_schema(), &config);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_unsupported_argument() {
        let diags = validate_config(&upstream_schema(), &json!({"retries_typo": 3}));
        assert!(diags.has_error());
        assert_eq!(diags.iter().next().unwrap().summary, "Unsupported argument");
    }

    #[test]
    fn test_missing_nested_required() {
        let config = json!({"nodes": [{"host": "127.0.0.1"}]});
        let diags = validate_config(&upstream_schema(), &config);
        let error = diags.errors().next().unwrap();
        assert_eq!(error.summary, "Missing required argument");
        assert_eq!(error.path.as_ref().unwrap().to_string(), "nodes[0].port");
    }

    #[test]
    fn test_read_only_attribute() {
        let diags = validate_config(&upstream_schema(), &json!({"id": "1"}));
        assert!(diags.has_error());
    }

    #[test]
    fn test_type_mismatch_skips_validators() {
        let config = json!({"nodes": [{"host": "a", "port": "eighty"}]});
        let diags = validate_config(&upstream_schema(), &config);
        assert_eq!(diags.error_count(), 1);
        assert_eq!(
            diags.errors().next().unwrap().summary,
            "Incorrect attribute value type"
        );
    }

    #[test]
    fn test_unknown_values_skip_validation() {
        let config = json!({
            "type": "${var.balancer}",
            "nodes": [{"host": "a", "port": "${var.port}"}]
        });
        let diags = validate_config(&upstream_schema(), &config);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_attribute_and_schema_validators() {
        let config = json!({
            "service_name": "svc",
            "nodes": [{"host": "a", "port": 70000}],
            "statuses": [200, 700]
        });
        let diags = validate_config(&upstream_schema(), &config);
        // conflicts_with, port range, statuses element, required_together
        assert_eq!(diags.error_count(), 4, "{diags}");
    }

    #[test]
    fn test_non_object_config() {
        let diags = validate_config(&upstream_schema(), &json!([1, 2]));
        assert!(diags.has_error());
    }
}
