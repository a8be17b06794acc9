//! Planned changes and their rendering

use crate::provider::ResourceRegistry;
use apisix_schema::{is_unknown, values_equal, AttributePath, Diagnostics};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

/// What happens to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Already up to date
    NoOp,
    /// Created
    Create,
    /// Updated in place
    Update,
    /// Deleted and created again
    Replace,
    /// Deleted
    Delete,
}

impl Action {
    fn symbol(&self) -> &'static str {
        match self {
            Action::NoOp => " ",
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace => "-/+",
            Action::Delete => "-",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Action::NoOp => "is up to date",
            Action::Create => "will be created",
            Action::Update => "will be updated in-place",
            Action::Replace => "must be replaced",
            Action::Delete => "will be destroyed",
        }
    }
}

/// Planned change of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// `type.name`
    pub address: String,
    /// Resource type
    pub resource_type: String,
    /// Local name
    pub name: String,
    /// What happens
    pub action: Action,
    /// State before the change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior: Option<Value>,
    /// State after the change, references to objects not created yet left
    /// unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned: Option<Value>,
    /// Configuration with its references, resolved again at apply time
    #[serde(skip)]
    pub config: Option<Value>,
    /// Attributes forcing the replacement
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replace_paths: Vec<AttributePath>,
    /// Addresses the resource depends on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// Changes in the order they are applied
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plan {
    /// Changes, creations and updates in dependency order followed by
    /// deletions
    pub changes: Vec<Change>,
    /// Data source results by address
    #[serde(skip)]
    pub data: BTreeMap<String, Value>,
    /// Warnings raised while planning
    pub diagnostics: Diagnostics,
}

/// Number of resources added, changed and destroyed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    /// Created, replacements included
    pub add: usize,
    /// Updated in place
    pub change: usize,
    /// Deleted, replacements included
    pub destroy: usize,
}

impl Plan {
    /// Whether applying the plan does anything
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != Action::NoOp)
    }

    /// Change for `address`
    pub fn change(&self, address: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.address == address)
    }

    /// Counts per kind of change
    pub fn counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for change in &self.changes {
            match change.action {
                Action::NoOp => {}
                Action::Create => counts.add += 1,
                Action::Update => counts.change += 1,
                Action::Replace => {
                    counts.add += 1;
                    counts.destroy += 1;
                }
                Action::Delete => counts.destroy += 1,
            }
        }
        counts
    }

    /// Human readable plan. Sensitive attributes are redacted using the
    /// schemas of `resources`.
    pub fn render(&self, resources: &ResourceRegistry) -> String {
        let mut out = String::new();
        for change in self.changes.iter().filter(|c| c.action != Action::NoOp) {
            let redact = |value: &Option<Value>| {
                let value = value.clone().unwrap_or(Value::Null);
                match resources.get(change.resource_type.as_str()) {
                    Some(resource) => resource.schema().redact(&value),
                    None => value,
                }
            };
            render_change(&mut out, change, &redact(&change.prior), &redact(&change.planned));
        }

        let counts = self.counts();
        if self.has_changes() {
            let _ = writeln!(
                out,
                "Plan: {} to add, {} to change, {} to destroy.",
                counts.add, counts.change, counts.destroy
            );
        } else {
            out.push_str("No changes. The configuration matches the applied state.\n");
        }
        out
    }
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} changed, {} destroyed",
            self.add, self.change, self.destroy
        )
    }
}

fn render_change(out: &mut String, change: &Change, prior: &Value, planned: &Value) {
    let _ = writeln!(out, "  # {} {}", change.address, change.action.describe());
    let _ = writeln!(
        out,
        "  {} resource \"{}\" \"{}\" {{",
        change.action.symbol(),
        change.resource_type,
        change.name
    );

    let forced: BTreeSet<String> = change.replace_paths.iter().map(|p| p.to_string()).collect();
    let keys: BTreeSet<&String> = prior
        .as_object()
        .into_iter()
        .chain(planned.as_object())
        .flat_map(|object| object.keys())
        .collect();
    let width = keys.iter().map(|k| k.len()).max().unwrap_or(0);

    for key in keys {
        let before = prior.get(key).unwrap_or(&Value::Null);
        let after = planned.get(key).unwrap_or(&Value::Null);
        let line = match (change.action, before.is_null(), after.is_null()) {
            (Action::Delete, _, _) => format!("- {key:width$} = {}", show(before)),
            (_, true, false) => format!("+ {key:width$} = {}", show(after)),
            (_, false, true) => format!("- {key:width$} = {}", show(before)),
            (_, false, false) if !values_equal(before, after) => {
                format!("~ {key:width$} = {} -> {}", show(before), show(after))
            }
            _ => continue,
        };
        let suffix = if forced.contains(key) {
            " # forces replacement"
        } else {
            ""
        };
        let _ = writeln!(out, "      {line}{suffix}");
    }
    out.push_str("    }\n\n");
}

fn show(value: &Value) -> String {
    if is_unknown(value) {
        "(known after apply)".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ApisixProvider;
    use serde_json::json;

    fn change(action: Action, prior: Option<Value>, planned: Option<Value>) -> Change {
        Change {
            address: "apisix_ssl_certificate.tls".to_string(),
            resource_type: "apisix_ssl_certificate".to_string(),
            name: "tls".to_string(),
            action,
            prior,
            planned,
            config: None,
            replace_paths: vec![],
            dependencies: vec![],
        }
    }

    #[test]
    fn test_counts() {
        let plan = Plan {
            changes: vec![
                change(Action::Create, None, Some(json!({}))),
                change(Action::Replace, Some(json!({})), Some(json!({}))),
                change(Action::NoOp, Some(json!({})), Some(json!({}))),
                change(Action::Delete, Some(json!({})), None),
            ],
            ..Default::default()
        };
        assert!(plan.has_changes());
        assert_eq!(
            plan.counts(),
            ChangeCounts {
                add: 2,
                change: 0,
                destroy: 2
            }
        );
    }

    #[test]
    fn test_render_redacts_and_marks_unknown() {
        let plan = Plan {
            changes: vec![change(
                Action::Update,
                Some(json!({"id": "1", "private_key": "old-key", "snis": ["a.com"]})),
                Some(json!({"id": "1", "private_key": "new-key", "snis": ["${apisix_route.api.host}"]})),
            )],
            ..Default::default()
        };
        let rendered = plan.render(&ApisixProvider::new().resources());

        assert!(rendered.contains("apisix_ssl_certificate.tls will be updated in-place"));
        assert!(!rendered.contains("new-key"));
        assert!(!rendered.contains("old-key"));
        assert!(rendered.contains("Plan: 0 to add, 1 to change, 0 to destroy."));
    }

    #[test]
    fn test_render_no_changes() {
        let plan = Plan::default();
        assert!(!plan.has_changes());
        assert!(plan.render(&ResourceRegistry::new()).starts_with("No changes."));
    }
}
