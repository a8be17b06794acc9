//! Schema and attribute definitions

use crate::plan_modifier::{PlanModifier, StaticDefault, UseStateForUnknown};
use crate::validator::{ConfigValidator, Validator};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Attributes of an object, keyed by name
pub type Attributes = BTreeMap<String, Attribute>;

/// Build an [`Attributes`] map from name/attribute pairs
pub fn attributes<const N: usize>(items: [(&str, Attribute); N]) -> Attributes {
    items
        .into_iter()
        .map(|(name, attribute)| (name.to_string(), attribute))
        .collect()
}

/// Type of a list or map element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// String element
    String,
    /// Integer element
    Int64,
    /// Arbitrary number element
    Number,
    /// Boolean element
    Bool,
}

impl ElementKind {
    /// Whether `value` has this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ElementKind::String => value.is_string(),
            ElementKind::Int64 => value.as_i64().is_some(),
            ElementKind::Number => value.is_number(),
            ElementKind::Bool => value.is_boolean(),
        }
    }

    /// Type name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::String => "string",
            ElementKind::Int64 => "int64",
            ElementKind::Number => "number",
            ElementKind::Bool => "bool",
        }
    }
}

/// Type of an attribute
#[derive(Debug, Clone)]
pub enum AttributeKind {
    /// String
    String,
    /// Integer
    Int64,
    /// Arbitrary number
    Number,
    /// Boolean
    Bool,
    /// List of scalars
    List(ElementKind),
    /// String-keyed map of scalars
    Map(ElementKind),
    /// Single nested object
    SingleNested(Attributes),
    /// List of nested objects
    ListNested(Attributes),
}

impl AttributeKind {
    /// Type name used in messages
    pub fn name(&self) -> String {
        match self {
            AttributeKind::String => "string".to_string(),
            AttributeKind::Int64 => "int64".to_string(),
            AttributeKind::Number => "number".to_string(),
            AttributeKind::Bool => "bool".to_string(),
            AttributeKind::List(elem) => format!("list({})", elem.name()),
            AttributeKind::Map(elem) => format!("map({})", elem.name()),
            AttributeKind::SingleNested(_) => "object".to_string(),
            AttributeKind::ListNested(_) => "list(object)".to_string(),
        }
    }

    /// Nested attributes of object kinds
    pub fn nested(&self) -> Option<&Attributes> {
        match self {
            AttributeKind::SingleNested(attrs) | AttributeKind::ListNested(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// A single attribute of a schema
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Value type
    pub kind: AttributeKind,
    /// Human readable description
    pub description: String,
    /// Must be set in configuration
    pub required: bool,
    /// May be set in configuration
    pub optional: bool,
    /// Value may be supplied by the provider or the API
    pub computed: bool,
    /// Value is redacted from plan output
    pub sensitive: bool,
    /// Changing the value destroys and recreates the object
    pub requires_replace: bool,
    /// Validators run on known, non-null configuration values
    pub validators: Vec<Arc<dyn Validator>>,
    /// Plan modifiers, run in order
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
}

impl Attribute {
    /// Create an attribute of the given kind
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            validators: Vec::new(),
            plan_modifiers: Vec::new(),
        }
    }

    /// String attribute
    pub fn string() -> Self {
        Self::new(AttributeKind::String)
    }

    /// Integer attribute
    pub fn int64() -> Self {
        Self::new(AttributeKind::Int64)
    }

    /// Number attribute
    pub fn number() -> Self {
        Self::new(AttributeKind::Number)
    }

    /// Boolean attribute
    pub fn bool() -> Self {
        Self::new(AttributeKind::Bool)
    }

    /// List attribute
    pub fn list(element: ElementKind) -> Self {
        Self::new(AttributeKind::List(element))
    }

    /// Map attribute
    pub fn map(element: ElementKind) -> Self {
        Self::new(AttributeKind::Map(element))
    }

    /// Single nested object attribute
    pub fn single_nested(attributes: Attributes) -> Self {
        Self::new(AttributeKind::SingleNested(attributes))
    }

    /// List of nested objects attribute
    pub fn list_nested(attributes: Attributes) -> Self {
        Self::new(AttributeKind::ListNested(attributes))
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark as sensitive
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Changing the value forces replacement
    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a validator
    pub fn validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Add a plan modifier
    pub fn plan_modifier(mut self, modifier: impl PlanModifier + 'static) -> Self {
        self.plan_modifiers.push(Arc::new(modifier));
        self
    }

    /// Optional and computed, defaulting to `value` when not configured
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        self.optional()
            .computed()
            .plan_modifier(StaticDefault::new(value))
    }

    /// Keep the prior state value while the planned value is unknown
    pub fn use_state_for_unknown(self) -> Self {
        self.plan_modifier(UseStateForUnknown)
    }

    /// Whether the attribute may appear in configuration
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }

    /// JSON description of the attribute
    pub fn describe(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_string(), json!(self.kind.name()));
        if !self.description.is_empty() {
            out.insert("description".to_string(), json!(self.description));
        }
        for (flag, set) in [
            ("required", self.required),
            ("optional", self.optional),
            ("computed", self.computed),
            ("sensitive", self.sensitive),
            ("requires_replace", self.requires_replace),
        ] {
            if set {
                out.insert(flag.to_string(), json!(true));
            }
        }
        if !self.validators.is_empty() {
            let validators: Vec<String> = self.validators.iter().map(|v| v.description()).collect();
            out.insert("validators".to_string(), json!(validators));
        }
        if !self.plan_modifiers.is_empty() {
            let modifiers: Vec<String> = self
                .plan_modifiers
                .iter()
                .map(|m| m.description())
                .collect();
            out.insert("plan_modifiers".to_string(), json!(modifiers));
        }
        if let Some(nested) = self.kind.nested() {
            out.insert("attributes".to_string(), describe_attributes(nested));
        }
        Value::Object(out)
    }
}

fn describe_attributes(attributes: &Attributes) -> Value {
    Value::Object(
        attributes
            .iter()
            .map(|(name, attribute)| (name.clone(), attribute.describe()))
            .collect(),
    )
}

/// Schema of a provider, resource or data source
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Schema version
    pub version: u64,
    /// Human readable description
    pub description: String,
    /// Top level attributes
    pub attributes: Attributes,
    /// Validators looking at the whole configuration object
    pub validators: Vec<Arc<dyn ConfigValidator>>,
}

impl Schema {
    /// Create a schema from its attributes
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Default::default()
        }
    }

    /// Set the version
    pub fn version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a configuration validator
    pub fn validator(mut self, validator: impl ConfigValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Look up a top level attribute
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// JSON description of the schema
    pub fn describe(&self) -> Value {
        let validators: Vec<String> = self.validators.iter().map(|v| v.description()).collect();
        json!({
            "version": self.version,
            "description": self.description,
            "attributes": describe_attributes(&self.attributes),
            "validators": validators,
        })
    }

    /// Copy of `value` with sensitive attributes replaced by a marker
    pub fn redact(&self, value: &Value) -> Value {
        redact_object(&self.attributes, value)
    }
}

const REDACTED: &str = "(sensitive value)";

fn redact_object(attributes: &Attributes, value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };
    let mut out = Map::new();
    for (name, item) in object {
        let redacted = match attributes.get(name) {
            Some(attribute) if attribute.sensitive && !item.is_null() => json!(REDACTED),
            Some(Attribute {
                kind: AttributeKind::SingleNested(nested),
                ..
            }) => redact_object(nested, item),
            Some(Attribute {
                kind: AttributeKind::ListNested(nested),
                ..
            }) => match item {
                Value::Array(items) => {
                    Value::Array(items.iter().map(|i| redact_object(nested, i)).collect())
                }
                other => other.clone(),
            },
            _ => item.clone(),
        };
        out.insert(name.clone(), redacted);
    }
    Value::Object(out)
}
