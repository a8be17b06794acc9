//! Attribute and configuration validators
//!
//! Attribute validators run only when the configured value is known and
//! not null. Configuration validators see the whole object and treat an
//! unknown value as set.

use crate::diagnostics::Diagnostics;
use crate::is_unknown;
use crate::path::AttributePath;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Input of an attribute validator
#[derive(Debug)]
pub struct ValidateRequest<'a> {
    /// Location of the value
    pub path: &'a AttributePath,
    /// Configured value, known and not null
    pub value: &'a Value,
    /// Configuration object holding the attribute
    pub parent: &'a Map<String, Value>,
}

/// Validates one attribute value
pub trait Validator: Send + Sync + Debug {
    /// Human readable description
    fn description(&self) -> String;

    /// Check the value, recording problems in `diags`
    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics);
}

fn is_set(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}

/// Fails when any of the named sibling attributes is also set
#[derive(Debug, Clone)]
pub struct ConflictsWith {
    others: Vec<String>,
}

/// Attribute conflicts with the named siblings
pub fn conflicts_with(others: &[&str]) -> ConflictsWith {
    ConflictsWith {
        others: others.iter().map(|s| s.to_string()).collect(),
    }
}

impl Validator for ConflictsWith {
    fn description(&self) -> String {
        format!("conflicts with {}", self.others.join(", "))
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        for other in &self.others {
            if is_set(req.parent.get(other)) {
                diags.add_attribute_error(
                    req.path.clone(),
                    "Invalid Attribute Combination",
                    format!("Attribute \"{other}\" cannot be specified when \"{}\" is specified", req.path),
                );
            }
        }
    }
}

/// String must be one of a fixed set of values
#[derive(Debug, Clone)]
pub struct OneOf {
    options: Vec<String>,
    case_insensitive: bool,
}

/// String must equal one of `options`
pub fn one_of(options: &[&str]) -> OneOf {
    OneOf {
        options: options.iter().map(|s| s.to_string()).collect(),
        case_insensitive: false,
    }
}

/// String must equal one of `options`, ignoring case
pub fn one_of_case_insensitive(options: &[&str]) -> OneOf {
    OneOf {
        case_insensitive: true,
        ..one_of(options)
    }
}

impl Validator for OneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.options.join(", "))
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(value) = req.value.as_str() else {
            return;
        };
        let found = self.options.iter().any(|option| {
            if self.case_insensitive {
                option.eq_ignore_ascii_case(value)
            } else {
                option == value
            }
        });
        if !found {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid Attribute Value Match",
                format!(
                    "Attribute {} value must be one of: [{}], got: \"{value}\"",
                    req.path,
                    self.options
                        .iter()
                        .map(|o| format!("\"{o}\""))
                        .collect::<Vec<_>>()
                        .join(" ")
                ),
            );
        }
    }
}

/// Requires a sibling attribute when the string has a given value
#[derive(Debug, Clone)]
pub struct RequiresWhen {
    value: String,
    sibling: String,
}

/// When the value equals `value` (ignoring case), `sibling` must be set
pub fn requires_when(value: &str, sibling: &str) -> RequiresWhen {
    RequiresWhen {
        value: value.to_string(),
        sibling: sibling.to_string(),
    }
}

impl Validator for RequiresWhen {
    fn description(&self) -> String {
        format!("\"{}\" requires {}", self.value, self.sibling)
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(value) = req.value.as_str() else {
            return;
        };
        if value.eq_ignore_ascii_case(&self.value) && !is_set(req.parent.get(&self.sibling)) {
            diags.add_attribute_error(
                req.path.clone(),
                "Missing Attribute Configuration",
                format!(
                    "Attribute \"{}\" must be specified when \"{}\" is \"{value}\"",
                    self.sibling, req.path
                ),
            );
        }
    }
}

/// Integer bounds, both inclusive
#[derive(Debug, Clone)]
pub struct IntRange {
    min: Option<i64>,
    max: Option<i64>,
}

/// Integer between `min` and `max`, inclusive
pub fn int_between(min: i64, max: i64) -> IntRange {
    IntRange {
        min: Some(min),
        max: Some(max),
    }
}

/// Integer of at least `min`
pub fn int_at_least(min: i64) -> IntRange {
    IntRange {
        min: Some(min),
        max: None,
    }
}

impl Validator for IntRange {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {min} and {max}"),
            (Some(min), None) => format!("value must be at least {min}"),
            (None, Some(max)) => format!("value must be at most {max}"),
            (None, None) => "any integer".to_string(),
        }
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(value) = req.value.as_i64() else {
            return;
        };
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {value}", req.path, self.description()),
            );
        }
    }
}

/// Integer must be one of a fixed set
#[derive(Debug, Clone)]
pub struct IntOneOf {
    options: Vec<i64>,
}

/// Integer must equal one of `options`
pub fn int_one_of(options: &[i64]) -> IntOneOf {
    IntOneOf {
        options: options.to_vec(),
    }
}

impl Validator for IntOneOf {
    fn description(&self) -> String {
        let options: Vec<String> = self.options.iter().map(|o| o.to_string()).collect();
        format!("value must be one of: {}", options.join(", "))
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(value) = req.value.as_i64() else {
            return;
        };
        if !self.options.contains(&value) {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid Attribute Value Match",
                format!("Attribute {} {}, got: {value}", req.path, self.description()),
            );
        }
    }
}

/// Number bounds, both inclusive
#[derive(Debug, Clone)]
pub struct NumberRange {
    min: Option<f64>,
    max: Option<f64>,
}

/// Number of at least `min`
pub fn number_at_least(min: f64) -> NumberRange {
    NumberRange {
        min: Some(min),
        max: None,
    }
}

/// Number of at most `max`
pub fn number_at_most(max: f64) -> NumberRange {
    NumberRange {
        min: None,
        max: Some(max),
    }
}

impl Validator for NumberRange {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {min} and {max}"),
            (Some(min), None) => format!("value must be at least {min}"),
            (None, Some(max)) => format!("value must be at most {max}"),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let Some(value) = req.value.as_f64() else {
            return;
        };
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {value}", req.path, self.description()),
            );
        }
    }
}

/// Runs an inner validator on every element of a list or map
#[derive(Debug)]
pub struct Each<V> {
    inner: V,
}

/// Apply `inner` to each list element or map value
pub fn each<V: Validator>(inner: V) -> Each<V> {
    Each { inner }
}

impl<V: Validator> Validator for Each<V> {
    fn description(&self) -> String {
        format!("each element: {}", self.inner.description())
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        match req.value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if item.is_null() || is_unknown(item) {
                        continue;
                    }
                    let path = req.path.index(index);
                    self.inner.validate(
                        &ValidateRequest {
                            path: &path,
                            value: item,
                            parent: req.parent,
                        },
                        diags,
                    );
                }
            }
            Value::Object(entries) => {
                for (key, item) in entries {
                    if item.is_null() || is_unknown(item) {
                        continue;
                    }
                    let path = req.path.key(key);
                    self.inner.validate(
                        &ValidateRequest {
                            path: &path,
                            value: item,
                            parent: req.parent,
                        },
                        diags,
                    );
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Greater,
    AtLeast,
    AtMost,
}

/// Constrains the number of elements of a list or map
#[derive(Debug, Clone)]
pub struct ElementCount {
    comparison: Comparison,
    bound: usize,
}

/// More than `bound` elements
pub fn elements_greater_than(bound: usize) -> ElementCount {
    ElementCount {
        comparison: Comparison::Greater,
        bound,
    }
}

/// At least `bound` elements
pub fn elements_at_least(bound: usize) -> ElementCount {
    ElementCount {
        comparison: Comparison::AtLeast,
        bound,
    }
}

/// At most `bound` elements
pub fn elements_at_most(bound: usize) -> ElementCount {
    ElementCount {
        comparison: Comparison::AtMost,
        bound,
    }
}

impl Validator for ElementCount {
    fn description(&self) -> String {
        let relation = match self.comparison {
            Comparison::Greater => "greater than",
            Comparison::AtLeast => "greater than or equal to",
            Comparison::AtMost => "less than or equal to",
        };
        format!("element count must be {relation} {}", self.bound)
    }

    fn validate(&self, req: &ValidateRequest<'_>, diags: &mut Diagnostics) {
        let count = match req.value {
            Value::Array(items) => items.len(),
            Value::Object(entries) => entries.len(),
            _ => return,
        };
        let ok = match self.comparison {
            Comparison::Greater => count > self.bound,
            Comparison::AtLeast => count >= self.bound,
            Comparison::AtMost => count <= self.bound,
        };
        if !ok {
            diags.add_attribute_error(
                req.path.clone(),
                "Invalid Attribute Value",
                format!("Attribute {} {}, got: {count}", req.path, self.description()),
            );
        }
    }
}

/// Validates a whole configuration object
pub trait ConfigValidator: Send + Sync + Debug {
    /// Human readable description
    fn description(&self) -> String;

    /// Check the object, recording problems in `diags`
    fn validate(&self, path: &AttributePath, config: &Map<String, Value>, diags: &mut Diagnostics);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Conflicting,
    RequiredTogether,
    AtLeastOneOf,
    ExactlyOneOf,
}

/// Relationship between several attributes of the same object
#[derive(Debug, Clone)]
pub struct AttributeSet {
    rule: Rule,
    names: Vec<String>,
}

fn attribute_set(rule: Rule, names: &[&str]) -> AttributeSet {
    AttributeSet {
        rule,
        names: names.iter().map(|s| s.to_string()).collect(),
    }
}

/// At most one of `names` may be set
pub fn conflicting(names: &[&str]) -> AttributeSet {
    attribute_set(Rule::Conflicting, names)
}

/// Either all or none of `names` are set
pub fn required_together(names: &[&str]) -> AttributeSet {
    attribute_set(Rule::RequiredTogether, names)
}

/// At least one of `names` is set
pub fn at_least_one_of(names: &[&str]) -> AttributeSet {
    attribute_set(Rule::AtLeastOneOf, names)
}

/// Exactly one of `names` is set
pub fn exactly_one_of(names: &[&str]) -> AttributeSet {
    attribute_set(Rule::ExactlyOneOf, names)
}

impl ConfigValidator for AttributeSet {
    fn description(&self) -> String {
        let relation = match self.rule {
            Rule::Conflicting => "conflicting",
            Rule::RequiredTogether => "required together",
            Rule::AtLeastOneOf => "at least one of",
            Rule::ExactlyOneOf => "exactly one of",
        };
        format!("{relation}: {}", self.names.join(", "))
    }

    fn validate(&self, path: &AttributePath, config: &Map<String, Value>, diags: &mut Diagnostics) {
        let set: Vec<&String> = self
            .names
            .iter()
            .filter(|name| is_set(config.get(name.as_str())))
            .collect();
        let names = self.names.join(", ");
        let failure = match self.rule {
            Rule::Conflicting if set.len() > 1 => Some((
                "Invalid Attribute Combination",
                format!("These attributes cannot be configured together: [{names}]"),
            )),
            Rule::RequiredTogether if !set.is_empty() && set.len() != self.names.len() => Some((
                "Invalid Attribute Combination",
                format!("These attributes must be configured together: [{names}]"),
            )),
            Rule::AtLeastOneOf if set.is_empty() => Some((
                "Missing Attribute Configuration",
                format!("At least one of these attributes must be configured: [{names}]"),
            )),
            Rule::ExactlyOneOf if set.len() != 1 => Some((
                "Invalid Attribute Combination",
                format!("Exactly one of these attributes must be configured: [{names}]"),
            )),
            _ => None,
        };
        if let Some((summary, detail)) = failure {
            diags.add_attribute_error(path.clone(), summary, detail);
        }
    }
}
