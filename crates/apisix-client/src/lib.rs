//! # APISIX Client
//!
//! Client for the APISIX Admin API.
//!
//! [`AdminApi`] is the seam between the provider and APISIX. [`AdminClient`]
//! implements it over HTTP with `reqwest`, understands the response
//! envelopes of APISIX 2 and 3 and retries idempotent requests on
//! transient failures. The `testing` feature adds an in-memory
//! implementation and a `mockall` mock.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod api;
pub mod client;
pub mod config;
mod envelope;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{AdminApi, ApiObject};
#[cfg(any(test, feature = "testing"))]
pub use api::MockAdminApi;
pub use client::AdminClient;
pub use config::{ClientConfig, DEFAULT_ENDPOINT};
