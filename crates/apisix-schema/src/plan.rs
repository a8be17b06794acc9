//! Planning: configuration plus prior state gives the planned state

use crate::attribute::{AttributeKind, Attributes, Schema};
use crate::diagnostics::Diagnostics;
use crate::path::AttributePath;
use crate::plan_modifier::PlanModifyRequest;
use serde_json::{Map, Value};

/// Compute the planned state for `config`.
///
/// Plan modifiers run in declaration order on every attribute, nested
/// attributes first. Computed attributes that end up without a value keep
/// their prior state value. Null values are left out of the result.
pub fn plan(
    schema: &Schema,
    config: &Value,
    prior: Option<&Value>,
    diags: &mut Diagnostics,
) -> Value {
    let empty = Map::new();
    let config = config.as_object().unwrap_or(&empty);
    let prior = prior.and_then(Value::as_object);
    Value::Object(plan_object(
        &schema.attributes,
        config,
        prior,
        &AttributePath::root(),
        diags,
    ))
}

fn plan_object(
    attributes: &Attributes,
    config: &Map<String, Value>,
    prior: Option<&Map<String, Value>>,
    path: &AttributePath,
    diags: &mut Diagnostics,
) -> Map<String, Value> {
    let mut planned = Map::new();
    for (name, attribute) in attributes {
        let path = path.attribute(name);
        let config_value = config.get(name).unwrap_or(&Value::Null);
        let prior_value = prior.and_then(|p| p.get(name)).filter(|v| !v.is_null());

        let mut value = match (&attribute.kind, config_value) {
            (AttributeKind::SingleNested(nested), Value::Object(object)) => {
                Value::Object(plan_object(
                    nested,
                    object,
                    prior_value.and_then(Value::as_object),
                    &path,
                    diags,
                ))
            }
            (AttributeKind::ListNested(nested), Value::Array(items)) => {
                let prior_items = prior_value.and_then(Value::as_array);
                Value::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(index, item)| match item {
                            Value::Object(object) => Value::Object(plan_object(
                                nested,
                                object,
                                prior_items
                                    .and_then(|p| p.get(index))
                                    .and_then(Value::as_object),
                                &path.index(index),
                                diags,
                            )),
                            other => other.clone(),
                        })
                        .collect(),
                )
            }
            (_, other) => other.clone(),
        };

        for modifier in &attribute.plan_modifiers {
            let request = PlanModifyRequest {
                path: &path,
                config: config_value,
                planned: &value,
                prior: prior_value,
                parent: config,
            };
            if let Some(modified) = modifier.modify(&request, diags) {
                value = modified;
            }
        }

        if value.is_null() && attribute.computed && config_value.is_null() {
            if let Some(prior_value) = prior_value {
                value = prior_value.clone();
            }
        }

        if !value.is_null() {
            planned.insert(name.clone(), value);
        }
    }
    planned
}

/// Attributes marked `requires_replace` whose planned value differs from
/// the prior state.
pub fn replace_paths(schema: &Schema, planned: &Value, prior: &Value) -> Vec<AttributePath> {
    let mut paths = Vec::new();
    collect_replace_paths(
        &schema.attributes,
        planned,
        prior,
        &AttributePath::root(),
        &mut paths,
    );
    paths
}

fn collect_replace_paths(
    attributes: &Attributes,
    planned: &Value,
    prior: &Value,
    path: &AttributePath,
    paths: &mut Vec<AttributePath>,
) {
    for (name, attribute) in attributes {
        let planned_value = planned.get(name).unwrap_or(&Value::Null);
        let prior_value = prior.get(name).unwrap_or(&Value::Null);
        let path = path.attribute(name);
        if attribute.requires_replace {
            if !values_equal(planned_value, prior_value) {
                paths.push(path);
            }
            continue;
        }
        if let AttributeKind::SingleNested(nested) = &attribute.kind {
            collect_replace_paths(nested, planned_value, prior_value, &path, paths);
        }
    }
}

/// Structural equality where numbers compare by value, so `3` equals `3.0`
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, x)| y.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}
