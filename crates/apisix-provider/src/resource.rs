//! Resources: lifecycle of one Admin API object type

use apisix_client::AdminApi;
use apisix_core::{Error, Result};
use apisix_model::ApiModel;
use apisix_schema::{plan, replace_paths, validate_config, AttributePath, Diagnostics, Schema};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of planning one resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourcePlan {
    /// Planned state
    pub planned: Value,
    /// Attributes whose change forces the object to be recreated
    pub requires_replace: Vec<AttributePath>,
}

/// Object-safe view of a resource, working on state values
#[async_trait]
pub trait DynamicResource: Send + Sync {
    /// Resource type name, such as `apisix_route`
    fn type_name(&self) -> &'static str;

    /// Resource schema
    fn schema(&self) -> Schema;

    /// Check a configuration against the schema
    fn validate(&self, config: &Value) -> Diagnostics;

    /// Planned state for `config` given the `prior` state
    fn plan(&self, config: &Value, prior: Option<&Value>, diags: &mut Diagnostics) -> ResourcePlan;

    /// Identifier recorded in a state value
    fn id_of(&self, state: &Value) -> Option<String>;

    /// Create the object, returning the new state
    async fn create(&self, planned: &Value) -> Result<Value>;

    /// Current state of the object, `None` when it no longer exists
    async fn read(&self, state: &Value) -> Result<Option<Value>>;

    /// Update the object in place, returning the new state
    async fn update(&self, planned: &Value, prior: &Value) -> Result<Value>;

    /// Delete the object. Deleting a missing object succeeds.
    async fn delete(&self, state: &Value) -> Result<()>;

    /// State of an existing object
    async fn import(&self, id: &str) -> Result<Value>;
}

/// [`DynamicResource`] backed by an [`ApiModel`]
pub struct ApiResource<M> {
    client: Option<Arc<dyn AdminApi>>,
    _model: PhantomData<fn() -> M>,
}

impl<M: ApiModel> ApiResource<M> {
    /// Resource talking to `client`, or reporting
    /// [`Error::NotConfigured`] when there is none
    pub fn new(client: Option<Arc<dyn AdminApi>>) -> Self {
        Self {
            client,
            _model: PhantomData,
        }
    }

    fn client(&self) -> Result<&dyn AdminApi> {
        self.client.as_deref().ok_or(Error::NotConfigured)
    }

    fn required_id(model: &M) -> Result<String> {
        model
            .id()
            .map(str::to_string)
            .ok_or_else(|| Error::State(format!("{} state has no identifier", M::TYPE_NAME)))
    }
}

impl<M> fmt::Debug for ApiResource<M>
where
    M: ApiModel,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiResource")
            .field("type_name", &M::TYPE_NAME)
            .field("configured", &self.client.is_some())
            .finish()
    }
}

#[async_trait]
impl<M: ApiModel> DynamicResource for ApiResource<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        M::schema()
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        validate_config(&M::schema(), config)
    }

    fn plan(&self, config: &Value, prior: Option<&Value>, diags: &mut Diagnostics) -> ResourcePlan {
        let schema = M::schema();
        let planned = plan(&schema, config, prior, diags);
        if let Some(object) = planned.as_object() {
            M::validate_plan(object, diags);
        }
        let requires_replace = prior
            .map(|prior| replace_paths(&schema, &planned, prior))
            .unwrap_or_default();
        ResourcePlan {
            planned,
            requires_replace,
        }
    }

    fn id_of(&self, state: &Value) -> Option<String> {
        M::from_state(state).ok()?.id().map(str::to_string)
    }

    async fn create(&self, planned: &Value) -> Result<Value> {
        let client = self.client()?;
        let model = M::from_state(planned)?;
        let body = model.to_api()?;

        let object = match model.assigned_id() {
            Some(id) => client.put(M::KIND, &id, &body).await?,
            None => client.create(M::KIND, &body).await?,
        };
        info!(resource = M::TYPE_NAME, id = %object.id, "Created object");

        M::from_api(&object.id, &object.value, Some(&model))?.to_state()
    }

    async fn read(&self, state: &Value) -> Result<Option<Value>> {
        let client = self.client()?;
        let prior = M::from_state(state)?;
        let id = Self::required_id(&prior)?;

        match client.get(M::KIND, &id).await {
            Ok(object) => {
                debug!(resource = M::TYPE_NAME, id = %id, "Read object");
                let model = M::from_api(&object.id, &object.value, Some(&prior))?;
                Ok(Some(model.to_state()?))
            }
            Err(e) if e.is_not_found() => {
                warn!(
                    resource = M::TYPE_NAME,
                    id = %id,
                    "Object no longer exists, removing it from state"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(&self, planned: &Value, prior: &Value) -> Result<Value> {
        let client = self.client()?;
        let model = M::from_state(planned)?;
        let id = Self::required_id(&M::from_state(prior)?)?;
        let body = model.to_api()?;

        let object = client.put(M::KIND, &id, &body).await?;
        info!(resource = M::TYPE_NAME, id = %id, "Updated object");

        M::from_api(&object.id, &object.value, Some(&model))?.to_state()
    }

    async fn delete(&self, state: &Value) -> Result<()> {
        let client = self.client()?;
        let id = Self::required_id(&M::from_state(state)?)?;

        match client.delete(M::KIND, &id).await {
            Ok(()) => {
                info!(resource = M::TYPE_NAME, id = %id, "Deleted object");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(resource = M::TYPE_NAME, id = %id, "Object already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn import(&self, id: &str) -> Result<Value> {
        let object = self.client()?.get(M::KIND, id).await?;
        info!(resource = M::TYPE_NAME, id = %object.id, "Imported object");
        M::from_api(&object.id, &object.value, None)?.to_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_client::testing::InMemoryAdmin;
    use apisix_client::MockAdminApi;
    use apisix_core::ObjectKind;
    use apisix_model::{ConsumerModel, RouteModel, UpstreamModel};
    use serde_json::json;

    fn resource<M: ApiModel>(admin: &Arc<InMemoryAdmin>) -> ApiResource<M> {
        let client: Arc<dyn AdminApi> = admin.clone();
        ApiResource::new(Some(client))
    }

    fn planned<M: ApiModel>(resource: &ApiResource<M>, config: Value) -> Value {
        let mut diags = Diagnostics::new();
        let plan = resource.plan(&config, None, &mut diags);
        assert!(!diags.has_error(), "{diags}");
        plan.planned
    }

    #[tokio::test]
    async fn test_create_read_update_delete() {
        let admin = Arc::new(InMemoryAdmin::new());
        let upstreams = resource::<UpstreamModel>(&admin);

        let planned = planned(
            &upstreams,
            json!({"name": "backend", "nodes": [{"host": "127.0.0.1", "port": 1980}]}),
        );
        assert_eq!(planned["type"], json!("roundrobin"));

        let state = upstreams.create(&planned).await.unwrap();
        let id = upstreams.id_of(&state).unwrap();
        let stored = admin.object(ObjectKind::Upstream, &id).await.unwrap();
        assert_eq!(stored["nodes"][0]["port"], json!(1980));

        let read = upstreams.read(&state).await.unwrap().unwrap();
        assert_eq!(read["name"], json!("backend"));

        let mut diags = Diagnostics::new();
        let update = upstreams.plan(
            &json!({"name": "backend-v2", "nodes": [{"host": "127.0.0.1", "port": 1980}]}),
            Some(&state),
            &mut diags,
        );
        assert!(update.requires_replace.is_empty());
        assert_eq!(update.planned["id"], json!(id));
        let updated = upstreams.update(&update.planned, &state).await.unwrap();
        assert_eq!(updated["name"], json!("backend-v2"));

        upstreams.delete(&updated).await.unwrap();
        assert_eq!(admin.count(ObjectKind::Upstream).await, 0);
        assert!(upstreams.read(&updated).await.unwrap().is_none());
        upstreams.delete(&updated).await.unwrap();
    }

    #[tokio::test]
    async fn test_assigned_id_uses_put() {
        let admin = Arc::new(InMemoryAdmin::new());
        let consumers = resource::<ConsumerModel>(&admin);

        let planned = planned(&consumers, json!({"username": "jack"}));
        let state = consumers.create(&planned).await.unwrap();
        assert_eq!(state["username"], json!("jack"));
        assert!(admin.object(ObjectKind::Consumer, "jack").await.is_some());

        let mut diags = Diagnostics::new();
        let renamed = consumers.plan(&json!({"username": "jill"}), Some(&state), &mut diags);
        assert_eq!(renamed.requires_replace.len(), 1);
    }

    #[tokio::test]
    async fn test_import() {
        let admin = Arc::new(InMemoryAdmin::new());
        admin
            .seed(
                ObjectKind::Route,
                "100",
                json!({"id": "100", "name": "legacy", "uri": "/legacy/*", "status": 1}),
            )
            .await;
        let routes = resource::<RouteModel>(&admin);

        let state = routes.import("100").await.unwrap();
        assert_eq!(state["id"], json!("100"));
        assert_eq!(state["uri"], json!("/legacy/*"));
        assert_eq!(state["is_enabled"], json!(true));

        assert!(routes.import("404").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_not_configured() {
        let routes = ApiResource::<RouteModel>::new(None);
        let err = routes.import("1").await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }

    #[tokio::test]
    async fn test_read_propagates_server_errors() {
        let mut mock = MockAdminApi::new();
        mock.expect_get().returning(|_, _| {
            Err(Error::Api {
                status: 500,
                message: "etcd unavailable".to_string(),
            })
        });
        let client: Arc<dyn AdminApi> = Arc::new(mock);
        let upstreams = ApiResource::<UpstreamModel>::new(Some(client));

        let err = upstreams
            .read(&json!({"id": "1", "type": "roundrobin"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_delete_ignores_not_found() {
        let mut mock = MockAdminApi::new();
        mock.expect_delete()
            .times(1)
            .returning(|_, id| Err(Error::NotFound(format!("/upstreams/{id}"))));
        let client: Arc<dyn AdminApi> = Arc::new(mock);
        let upstreams = ApiResource::<UpstreamModel>::new(Some(client));

        upstreams.delete(&json!({"id": "7"})).await.unwrap();
    }

    #[test]
    fn test_validate_reports_schema_errors() {
        let routes = ApiResource::<RouteModel>::new(None);
        let diags = routes.validate(&json!({"name": "api", "uri": "/", "bogus": 1}));
        assert!(diags.has_error());
    }
}
