//! # APISIX Provider
//!
//! Manages Apache APISIX objects declaratively.
//!
//! - [`ApisixProvider`] configures the Admin API client and exposes the
//!   resource and data source registries
//! - [`ApiResource`] and [`ApiDataSource`] adapt every
//!   [`ApiModel`](apisix_model::ApiModel) to the object-safe
//!   [`DynamicResource`] and [`DynamicDataSource`] traits
//! - [`Engine`] plans a document against the [`State`], applies the plan,
//!   refreshes, imports and destroys

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod data_source;
pub mod engine;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod state;

pub use data_source::{ApiDataSource, DynamicDataSource};
pub use engine::{Engine, RefreshSummary};
pub use plan::{Action, Change, ChangeCounts, Plan};
pub use provider::{
    ApisixProvider, DataSourceRegistry, ResourceRegistry, API_KEY_ENV, ENDPOINT_ENV,
};
pub use resource::{ApiResource, DynamicResource, ResourcePlan};
pub use state::{ResourceState, State, DEFAULT_STATE_FILE, STATE_VERSION};
