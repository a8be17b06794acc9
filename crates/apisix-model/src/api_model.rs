//! Contract between a resource model, its schema and the Admin API

use crate::convert::JsonMap;
use apisix_core::{Error, ObjectKind, Result};
use apisix_schema::{Diagnostics, Schema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Model of an APISIX object managed as a resource.
///
/// The state of a resource is the serde form of its model: optional fields
/// left unset are omitted, so the state, the configuration and the planned
/// values all share one JSON shape.
pub trait ApiModel:
    Serialize + DeserializeOwned + Clone + Debug + Default + PartialEq + Send + Sync + 'static
{
    /// Admin API object kind
    const KIND: ObjectKind;

    /// Resource type name, such as `apisix_route`
    const TYPE_NAME: &'static str;

    /// Resource schema
    fn schema() -> Schema;

    /// Identifier recorded in state
    fn id(&self) -> Option<&str>;

    /// Identifier chosen by the configuration rather than by APISIX
    fn assigned_id(&self) -> Option<String> {
        None
    }

    /// Request body for the Admin API
    fn to_api(&self) -> Result<JsonMap>;

    /// Model from an Admin API object. `prior` is the model as recorded in
    /// state, used to keep write-only values and formatting.
    fn from_api(id: &str, value: &JsonMap, prior: Option<&Self>) -> Result<Self>;

    /// Checks that need the whole planned object
    fn validate_plan(_planned: &JsonMap, _diags: &mut Diagnostics) {}

    /// Model from its state representation
    fn from_state(state: &Value) -> Result<Self> {
        serde_json::from_value(state.clone())
            .map_err(|e| Error::State(format!("invalid {} state: {e}", Self::TYPE_NAME)))
    }

    /// State representation of the model
    fn to_state(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
