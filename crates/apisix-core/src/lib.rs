//! # APISIX Core
//!
//! Error handling and the vocabulary shared by every crate of the APISIX
//! provider: the error enum, the `Result` alias and the kinds of objects
//! exposed by the Admin API.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ObjectKind, HTTP_METHODS};
