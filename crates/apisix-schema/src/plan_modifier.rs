//! Plan modifiers adjust planned values before they are shown or applied

use crate::diagnostics::Diagnostics;
use crate::is_unknown;
use crate::path::AttributePath;
use serde_json::{Map, Value};
use std::fmt::Debug;

/// Input of a plan modifier
#[derive(Debug)]
pub struct PlanModifyRequest<'a> {
    /// Location of the value
    pub path: &'a AttributePath,
    /// Configured value, null when not set
    pub config: &'a Value,
    /// Value planned so far
    pub planned: &'a Value,
    /// Value in prior state, `None` when the object is being created
    pub prior: Option<&'a Value>,
    /// Configuration object holding the attribute
    pub parent: &'a Map<String, Value>,
}

/// Adjusts one planned attribute value
pub trait PlanModifier: Send + Sync + Debug {
    /// Human readable description
    fn description(&self) -> String;

    /// New planned value, or `None` to keep the current one
    fn modify(&self, req: &PlanModifyRequest<'_>, diags: &mut Diagnostics) -> Option<Value>;
}

/// Plans a fixed value when the attribute is not configured
#[derive(Debug, Clone)]
pub struct StaticDefault {
    value: Value,
}

impl StaticDefault {
    /// Default to `value`
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl PlanModifier for StaticDefault {
    fn description(&self) -> String {
        format!("defaults to {}", self.value)
    }

    fn modify(&self, req: &PlanModifyRequest<'_>, _diags: &mut Diagnostics) -> Option<Value> {
        req.config.is_null().then(|| self.value.clone())
    }
}

/// Keeps the prior state value while the planned value is unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "uses the prior state value while unknown".to_string()
    }

    fn modify(&self, req: &PlanModifyRequest<'_>, _diags: &mut Diagnostics) -> Option<Value> {
        let prior = req.prior.filter(|p| !p.is_null())?;
        (req.planned.is_null() || is_unknown(req.planned)).then(|| prior.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modify(
        modifier: &dyn PlanModifier,
        config: Value,
        planned: Value,
        prior: Option<Value>,
    ) -> Option<Value> {
        let path = AttributePath::root().attribute("field");
        let parent = Map::new();
        let mut diags = Diagnostics::new();
        modifier.modify(
            &PlanModifyRequest {
                path: &path,
                config: &config,
                planned: &planned,
                prior: prior.as_ref(),
                parent: &parent,
            },
            &mut diags,
        )
    }

    #[test]
    fn test_static_default_only_when_unset() {
        let modifier = StaticDefault::new("roundrobin");
        assert_eq!(
            modify(&modifier, Value::Null, Value::Null, None),
            Some(json!("roundrobin"))
        );
        assert_eq!(modify(&modifier, json!("chash"), json!("chash"), None), None);
    }

    #[test]
    fn test_use_state_for_unknown() {
        let modifier = UseStateForUnknown;
        assert_eq!(
            modify(&modifier, Value::Null, Value::Null, Some(json!("abc"))),
            Some(json!("abc"))
        );
        assert_eq!(modify(&modifier, Value::Null, Value::Null, None), None);
        assert_eq!(
            modify(&modifier, json!("x"), json!("x"), Some(json!("abc"))),
            None
        );
    }
}
