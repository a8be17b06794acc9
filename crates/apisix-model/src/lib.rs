//! # APISIX Model
//!
//! Models of the APISIX objects managed by the provider and their
//! conversions between state and the Admin API.
//!
//! Each resource type implements [`ApiModel`]: it declares its [`Schema`],
//! builds the Admin API request body from its state and reads the object
//! returned by APISIX back into state. Plugins form a parallel hierarchy
//! under [`plugins`], one module per plugin.
//!
//! [`Schema`]: apisix_schema::Schema

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod api_model;
pub mod certificate;
pub mod consumer;
pub mod convert;
pub mod global_rule;
pub mod plugin_metadata;
pub mod plugins;
pub mod route;
pub mod service;
pub mod ssl;
pub mod stream_route;
pub mod timeout;
pub mod upstream;
pub mod upstream_checks;

pub use api_model::ApiModel;
pub use certificate::{cert_snis, check_private_key};
pub use consumer::ConsumerModel;
pub use convert::JsonMap;
pub use global_rule::GlobalRuleModel;
pub use plugin_metadata::PluginMetadataModel;
pub use plugins::{ConsumerPluginsModel, Plugin, PluginSet, PluginsModel};
pub use route::RouteModel;
pub use service::ServiceModel;
pub use ssl::SslModel;
pub use stream_route::StreamRouteModel;
pub use upstream::UpstreamModel;
