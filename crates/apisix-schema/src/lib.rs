//! # APISIX Schema
//!
//! Typed attribute schemas for provider, resource and data source
//! configuration.
//!
//! A [`Schema`] describes the attributes of an object together with the
//! validators and plan modifiers attached to them. Problems are reported
//! as [`Diagnostics`] so that a single run can surface every mistake in a
//! configuration instead of stopping at the first one.
//!
//! Values that cannot be known before apply (references to attributes of
//! other resources such as `${apisix_upstream.main.id}`) are carried as
//! strings and recognised with [`is_unknown`].

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod attribute;
pub mod diagnostics;
pub mod path;
pub mod plan;
pub mod plan_modifier;
pub mod validate;
pub mod validator;

pub use attribute::{attributes, Attribute, AttributeKind, Attributes, ElementKind, Schema};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use path::{AttributePath, PathStep};
pub use plan::{plan, replace_paths, values_equal};
pub use plan_modifier::{PlanModifier, PlanModifyRequest, StaticDefault, UseStateForUnknown};
pub use validate::validate_config;
pub use validator::{ConfigValidator, ValidateRequest, Validator};

use serde_json::Value;

/// Whether `value` is an unresolved reference to another object's attribute
pub fn is_unknown(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.starts_with("${") && s.ends_with('}'))
}
