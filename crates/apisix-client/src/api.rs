//! The Admin API operations the provider relies on

use apisix_core::{ObjectKind, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Object stored in APISIX
#[derive(Debug, Clone, PartialEq)]
pub struct ApiObject {
    /// Identifier of the object
    pub id: String,
    /// Object as returned by APISIX
    pub value: Map<String, Value>,
}

/// CRUD operations on Admin API objects.
///
/// Implemented by [`AdminClient`](crate::AdminClient) over HTTP and by the
/// in-memory double of the `testing` feature.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Fetch one object, `Error::NotFound` when it does not exist
    async fn get(&self, kind: ObjectKind, id: &str) -> Result<ApiObject>;

    /// Fetch every object of a kind
    async fn list(&self, kind: ObjectKind) -> Result<Vec<ApiObject>>;

    /// Create an object whose identifier is assigned by APISIX
    async fn create(&self, kind: ObjectKind, body: &Map<String, Value>) -> Result<ApiObject>;

    /// Create or replace the object with the given identifier
    async fn put(&self, kind: ObjectKind, id: &str, body: &Map<String, Value>) -> Result<ApiObject>;

    /// Delete an object
    async fn delete(&self, kind: ObjectKind, id: &str) -> Result<()>;
}
