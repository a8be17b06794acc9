//! Data sources: read-only lookups of existing objects

use apisix_client::{AdminApi, ApiObject};
use apisix_core::{Error, Result};
use apisix_model::ApiModel;
use apisix_schema::validator::exactly_one_of;
use apisix_schema::{validate_config, Attribute, AttributeKind, Attributes, Diagnostics, Schema};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Object-safe view of a data source
#[async_trait]
pub trait DynamicDataSource: Send + Sync {
    /// Data source type name, such as `apisix_upstream`
    fn type_name(&self) -> &'static str;

    /// Data source schema
    fn schema(&self) -> Schema;

    /// Check the lookup arguments
    fn validate(&self, config: &Value) -> Diagnostics;

    /// Look the object up
    async fn read(&self, config: &Value) -> Result<Value>;
}

/// Looks up an object of model `M` by `id` or by `name`
pub struct ApiDataSource<M> {
    client: Option<Arc<dyn AdminApi>>,
    _model: PhantomData<fn() -> M>,
}

impl<M: ApiModel> ApiDataSource<M> {
    /// Data source reading through `client`
    pub fn new(client: Option<Arc<dyn AdminApi>>) -> Self {
        Self {
            client,
            _model: PhantomData,
        }
    }

    async fn find_by_name(&self, client: &dyn AdminApi, name: &str) -> Result<ApiObject> {
        let mut matches = client
            .list(M::KIND)
            .await?
            .into_iter()
            .filter(|object| object.value.get("name").and_then(Value::as_str) == Some(name));

        let found = matches
            .next()
            .ok_or_else(|| Error::NotFound(format!("{} named '{name}'", M::TYPE_NAME)))?;
        if matches.next().is_some() {
            return Err(Error::Validation(format!(
                "more than one {} is named '{name}', look it up by id instead",
                M::TYPE_NAME
            )));
        }
        Ok(found)
    }
}

impl<M: ApiModel> fmt::Debug for ApiDataSource<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDataSource")
            .field("type_name", &M::TYPE_NAME)
            .field("configured", &self.client.is_some())
            .finish()
    }
}

#[async_trait]
impl<M: ApiModel> DynamicDataSource for ApiDataSource<M> {
    fn type_name(&self) -> &'static str {
        M::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        lookup_schema(&M::schema())
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        validate_config(&self.schema(), config)
    }

    async fn read(&self, config: &Value) -> Result<Value> {
        let client = self.client.as_deref().ok_or(Error::NotConfigured)?;
        let id = config.get("id").and_then(Value::as_str);
        let name = config.get("name").and_then(Value::as_str);

        let object = match (id, name) {
            (Some(id), _) => client.get(M::KIND, id).await?,
            (None, Some(name)) => self.find_by_name(client, name).await?,
            (None, None) => {
                return Err(Error::Validation(format!(
                    "{} needs either id or name",
                    M::TYPE_NAME
                )))
            }
        };
        debug!(data_source = M::TYPE_NAME, id = %object.id, "Looked up object");

        M::from_api(&object.id, &object.value, None)?.to_state()
    }
}

/// Schema of the lookup for a resource schema: every attribute becomes
/// read-only except `id` and `name`, exactly one of which is set.
fn lookup_schema(resource: &Schema) -> Schema {
    let mut attributes = computed_only(&resource.attributes);
    for key in ["id", "name"] {
        attributes.insert(
            key.to_string(),
            Attribute::string()
                .optional()
                .computed()
                .description(format!("Look the object up by {key}.")),
        );
    }

    Schema::new(attributes)
        .version(resource.version)
        .description(resource.description.clone())
        .validator(exactly_one_of(&["id", "name"]))
}

fn computed_only(attributes: &Attributes) -> Attributes {
    attributes
        .iter()
        .map(|(name, attribute)| {
            let kind = match &attribute.kind {
                AttributeKind::SingleNested(nested) => {
                    AttributeKind::SingleNested(computed_only(nested))
                }
                AttributeKind::ListNested(nested) => {
                    AttributeKind::ListNested(computed_only(nested))
                }
                other => other.clone(),
            };
            let mut computed = Attribute::new(kind).computed();
            computed.description = attribute.description.clone();
            computed.sensitive = attribute.sensitive;
            (name.clone(), computed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_client::testing::InMemoryAdmin;
    use apisix_core::ObjectKind;
    use apisix_model::{RouteModel, ServiceModel, UpstreamModel};
    use serde_json::json;

    async fn admin() -> Arc<InMemoryAdmin> {
        let admin = Arc::new(InMemoryAdmin::new());
        admin
            .seed(
                ObjectKind::Upstream,
                "1",
                json!({"id": "1", "name": "backend", "type": "roundrobin", "nodes": {"127.0.0.1:1980": 1}}),
            )
            .await;
        admin
            .seed(ObjectKind::Service, "2", json!({"id": "2", "name": "billing"}))
            .await;
        admin
            .seed(ObjectKind::Service, "3", json!({"id": "3", "name": "billing"}))
            .await;
        admin
    }

    fn source<M: ApiModel>(admin: &Arc<InMemoryAdmin>) -> ApiDataSource<M> {
        let client: Arc<dyn AdminApi> = admin.clone();
        ApiDataSource::new(Some(client))
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_name() {
        let admin = admin().await;
        let upstreams = source::<UpstreamModel>(&admin);

        let by_id = upstreams.read(&json!({"id": "1"})).await.unwrap();
        assert_eq!(by_id["name"], json!("backend"));
        assert_eq!(by_id["nodes"][0]["host"], json!("127.0.0.1"));

        let by_name = upstreams.read(&json!({"name": "backend"})).await.unwrap();
        assert_eq!(by_name, by_id);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let admin = admin().await;

        let services = source::<ServiceModel>(&admin);
        let err = services.read(&json!({"name": "billing"})).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let routes = source::<RouteModel>(&admin);
        let err = routes.read(&json!({"name": "missing"})).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lookup_schema() {
        let routes = ApiDataSource::<RouteModel>::new(None);
        assert!(!routes.validate(&json!({"name": "api"})).has_error());
        assert!(routes.validate(&json!({})).has_error());
        assert!(routes.validate(&json!({"id": "1", "name": "api"})).has_error());
        assert!(routes.validate(&json!({"id": "1", "uri": "/"})).has_error());

        let schema = routes.schema();
        let uri = schema.attribute("uri").unwrap();
        assert!(uri.computed && !uri.optional && !uri.required);
    }
}
