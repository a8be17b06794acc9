//! `prometheus` plugin

use super::{disable_attribute, Plugin};
use apisix_schema::{attributes, Attribute};
use serde::{Deserialize, Serialize};

/// Exposes route metrics to Prometheus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusPlugin {
    /// Plugin disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    /// Label metrics with the route name instead of its id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_name: Option<bool>,
}

impl Plugin for PrometheusPlugin {
    const NAME: &'static str = "prometheus";

    fn schema() -> Attribute {
        Attribute::single_nested(attributes([
            ("disable", disable_attribute()),
            (
                "prefer_name",
                Attribute::bool()
                    .default_value(true)
                    .description("When true, export the route name instead of the route id."),
            ),
        ]))
        .optional()
    }

    fn disabled(&self) -> bool {
        self.disable.unwrap_or(false)
    }
}
