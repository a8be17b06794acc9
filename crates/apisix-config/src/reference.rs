//! `${type.name.attribute}` references between blocks

use apisix_core::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;

const REFERENCE_PATTERN: &str =
    r"\$\{(data\.)?([a-z][a-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_-]*)\.([A-Za-z_][A-Za-z0-9_]*)\}";

/// Reference to an attribute of another block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    /// Points at a data source rather than a resource
    pub data: bool,
    /// Block type
    pub block_type: String,
    /// Block name
    pub name: String,
    /// Attribute of the block
    pub attribute: String,
}

impl Reference {
    /// Address of the referenced block
    pub fn address(&self) -> String {
        if self.data {
            format!("data.{}.{}", self.block_type, self.name)
        } else {
            format!("{}.{}", self.block_type, self.name)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}}}", self.address(), self.attribute)
    }
}

/// Finds references inside configuration values
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    pattern: Regex,
}

impl ReferenceScanner {
    /// Compile the reference pattern
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(REFERENCE_PATTERN)
            .map_err(|e| Error::Internal(format!("invalid reference pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// References in a string, in order of appearance
    pub fn in_str(&self, text: &str) -> Vec<Reference> {
        self.pattern
            .captures_iter(text)
            .filter_map(|cap| {
                Some(Reference {
                    data: cap.get(1).is_some(),
                    block_type: cap.get(2)?.as_str().to_string(),
                    name: cap.get(3)?.as_str().to_string(),
                    attribute: cap.get(4)?.as_str().to_string(),
                })
            })
            .collect()
    }

    /// References anywhere inside a JSON value
    pub fn in_value(&self, value: &Value) -> Vec<Reference> {
        let mut found = Vec::new();
        self.collect(value, &mut found);
        found
    }

    fn collect(&self, value: &Value, found: &mut Vec<Reference>) {
        match value {
            Value::String(text) => found.extend(self.in_str(text)),
            Value::Array(items) => items.iter().for_each(|item| self.collect(item, found)),
            Value::Object(map) => map.values().for_each(|item| self.collect(item, found)),
            _ => {}
        }
    }

    /// Replace references in `value` using `lookup`.
    ///
    /// A string made of a single reference takes the referenced value as is.
    /// References embedded in a longer string are interpolated. When a
    /// reference cannot be resolved yet the whole string is replaced by that
    /// reference so it stays recognisable as unknown.
    pub fn resolve<F>(&self, value: &Value, lookup: &F) -> Value
    where
        F: Fn(&Reference) -> Option<Value>,
    {
        match value {
            Value::String(text) => self.resolve_str(text, lookup),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.resolve(item, lookup)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.resolve(item, lookup)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn resolve_str<F>(&self, text: &str, lookup: &F) -> Value
    where
        F: Fn(&Reference) -> Option<Value>,
    {
        let references = self.in_str(text);
        if references.is_empty() {
            return Value::String(text.to_string());
        }

        if references.len() == 1 && references[0].to_string() == text {
            return lookup(&references[0]).unwrap_or_else(|| Value::String(text.to_string()));
        }

        let mut resolved = text.to_string();
        for reference in &references {
            let replacement = match lookup(reference) {
                Some(Value::String(s)) => s,
                Some(Value::Null) | None => return Value::String(reference.to_string()),
                Some(other) => other.to_string(),
            };
            resolved = resolved.replace(&reference.to_string(), &replacement);
        }
        Value::String(resolved)
    }
}
