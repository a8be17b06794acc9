//! Plan and apply a document against the state

use crate::plan::{Action, Change, ChangeCounts, Plan};
use crate::provider::ApisixProvider;
use crate::resource::DynamicResource;
use crate::state::{ResourceState, State};
use apisix_config::{dependencies, dependency_order, Document, Reference, ReferenceScanner};
use apisix_core::{Error, Result};
use apisix_schema::{is_unknown, values_equal, Diagnostics};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a refresh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Resources read back
    pub refreshed: usize,
    /// Resources gone from APISIX and dropped from state
    pub removed: usize,
}

/// Drives the provider over a whole document
#[derive(Debug)]
pub struct Engine {
    provider: ApisixProvider,
    scanner: ReferenceScanner,
}

impl Engine {
    /// Engine using `provider`
    pub fn new(provider: ApisixProvider) -> Result<Self> {
        Ok(Self {
            provider,
            scanner: ReferenceScanner::new()?,
        })
    }

    /// The provider
    pub fn provider(&self) -> &ApisixProvider {
        &self.provider
    }

    /// Human readable rendering of `plan`
    pub fn render(&self, plan: &Plan) -> String {
        plan.render(&self.provider.resources())
    }

    /// Read every data source of `document`, keyed by address
    pub async fn read_data_sources(&self, document: &Document) -> Result<BTreeMap<String, Value>> {
        let data_sources = self.provider.data_sources();
        let mut diagnostics = Diagnostics::new();
        let mut results = BTreeMap::new();

        for block in &document.data {
            let address = block.address();
            let Some(source) = data_sources.get(block.data_type.as_str()) else {
                diagnostics.add_error(
                    "Unknown data source type",
                    format!("{address}: the provider has no data source {}", block.data_type),
                );
                continue;
            };

            let config = Value::Object(block.config.clone());
            let diags = source.validate(&config);
            if diags.has_error() {
                collect(&address, diags, &mut diagnostics);
                continue;
            }

            let value = source
                .read(&config)
                .await
                .map_err(|e| with_address(&address, e))?;
            debug!(address = %address, "Read data source");
            results.insert(address, value);
        }

        fail_on_errors(diagnostics)?;
        Ok(results)
    }

    /// Changes needed to bring APISIX in line with `document`
    pub async fn plan(&self, document: &Document, state: &State) -> Result<Plan> {
        let data = self.read_data_sources(document).await?;
        let order = dependency_order(document)?;
        let resources = self.provider.resources();

        let mut diagnostics = Diagnostics::new();
        let mut planned_values: BTreeMap<String, Value> = BTreeMap::new();
        let mut changes = Vec::with_capacity(order.len());

        for index in order {
            let block = &document.resources[index];
            let address = block.address();
            let Some(resource) = resources.get(block.resource_type.as_str()) else {
                diagnostics.add_error(
                    "Unknown resource type",
                    format!("{address}: the provider has no resource {}", block.resource_type),
                );
                continue;
            };

            let raw = Value::Object(block.config.clone());
            let config = self
                .scanner
                .resolve(&raw, &|r: &Reference| lookup(&data, |a| planned_values.get(a), r));

            let mut diags = resource.validate(&config);
            if diags.has_error() {
                collect(&address, diags, &mut diagnostics);
                continue;
            }

            let prior = state.get(&address).map(|r| &r.attributes);
            let mut result = resource.plan(&config, prior, &mut diags);
            let action = match prior {
                None => Action::Create,
                Some(_) if !result.requires_replace.is_empty() => Action::Replace,
                Some(prior) if values_equal(&result.planned, prior) => Action::NoOp,
                Some(_) => Action::Update,
            };
            if action == Action::Replace {
                result.planned = resource.plan(&config, None, &mut Diagnostics::new()).planned;
            }
            collect(&address, diags, &mut diagnostics);

            debug!(address = %address, action = ?action, "Planned resource");
            planned_values.insert(address.clone(), result.planned.clone());
            changes.push(Change {
                address,
                resource_type: block.resource_type.clone(),
                name: block.name.clone(),
                action,
                prior: prior.cloned(),
                planned: Some(result.planned),
                config: Some(raw),
                replace_paths: result.requires_replace,
                dependencies: dependencies(&self.scanner, block).into_iter().collect(),
            });
        }

        let declared: BTreeSet<String> = document.resources.iter().map(|r| r.address()).collect();
        for address in state.destroy_order() {
            if !declared.contains(&address) {
                if let Some(prior) = state.get(&address) {
                    changes.push(delete_change(&address, prior));
                }
            }
        }

        fail_on_errors(diagnostics.clone())?;
        for warning in diagnostics.iter() {
            warn!("{warning}");
        }

        let plan = Plan {
            changes,
            data,
            diagnostics,
        };
        let counts = plan.counts();
        info!(
            add = counts.add,
            change = counts.change,
            destroy = counts.destroy,
            "Plan ready"
        );
        Ok(plan)
    }

    /// Plan deleting everything in `state`
    pub fn plan_destroy(&self, state: &State) -> Plan {
        let changes = state
            .destroy_order()
            .into_iter()
            .filter_map(|address| state.get(&address).map(|prior| delete_change(&address, prior)))
            .collect();
        Plan {
            changes,
            ..Default::default()
        }
    }

    /// Apply `plan`, recording every step in `state`. When `path` is given
    /// the state is saved there after each step, so a failure keeps the
    /// steps that succeeded.
    pub async fn apply(&self, plan: &Plan, state: &mut State, path: Option<&Path>) -> Result<ChangeCounts> {
        let resources = self.provider.resources();
        let mut counts = ChangeCounts::default();

        for change in plan.changes.iter().filter(|c| c.action != Action::NoOp) {
            let resource = resources
                .get(change.resource_type.as_str())
                .ok_or_else(|| {
                    Error::Internal(format!("no resource type {}", change.resource_type))
                })?;

            self.apply_change(resource, change, plan, state, path, &mut counts)
                .await
                .map_err(|e| with_address(&change.address, e))?;
        }

        info!(
            added = counts.add,
            changed = counts.change,
            destroyed = counts.destroy,
            "Apply complete"
        );
        Ok(counts)
    }

    async fn apply_change(
        &self,
        resource: &Arc<dyn DynamicResource>,
        change: &Change,
        plan: &Plan,
        state: &mut State,
        path: Option<&Path>,
        counts: &mut ChangeCounts,
    ) -> Result<()> {
        if matches!(change.action, Action::Delete | Action::Replace) {
            if let Some(prior) = state.get(&change.address) {
                resource.delete(&prior.attributes).await?;
            }
            state.remove(&change.address);
            counts.destroy += 1;
            save(state, path)?;
            if change.action == Action::Delete {
                return Ok(());
            }
        }

        let raw = change.config.clone().unwrap_or(Value::Null);
        let config = self
            .scanner
            .resolve(&raw, &|r: &Reference| {
                lookup(&plan.data, |a| state.get(a).map(|s| &s.attributes), r)
            });
        if let Some(reference) = self.scanner.in_value(&config).into_iter().next() {
            return Err(Error::Validation(format!(
                "reference {reference} has no value"
            )));
        }

        let prior = match change.action {
            Action::Update => state.get(&change.address).map(|r| r.attributes.clone()),
            _ => None,
        };

        let mut diags = resource.validate(&config);
        let planned = resource.plan(&config, prior.as_ref(), &mut diags).planned;
        fail_on_errors(diags)?;

        let applied = match &prior {
            Some(prior) => {
                counts.change += 1;
                resource.update(&planned, prior).await?
            }
            None => {
                counts.add += 1;
                resource.create(&planned).await?
            }
        };

        let mut recorded = ResourceState::new(
            change.resource_type.clone(),
            change.name.clone(),
            resource.id_of(&applied),
            applied,
        );
        recorded.dependencies = change.dependencies.clone();
        state.insert(change.address.clone(), recorded);
        save(state, path)
    }

    /// Delete every resource in `state`
    pub async fn destroy(&self, state: &mut State, path: Option<&Path>) -> Result<ChangeCounts> {
        let plan = self.plan_destroy(state);
        self.apply(&plan, state, path).await
    }

    /// Read every resource in `state` back from APISIX
    pub async fn refresh(&self, state: &mut State, path: Option<&Path>) -> Result<RefreshSummary> {
        let resources = self.provider.resources();
        let mut summary = RefreshSummary::default();
        let addresses: Vec<String> = state.resources.keys().cloned().collect();

        for address in addresses {
            let Some(current) = state.get(&address).cloned() else {
                continue;
            };
            let Some(resource) = resources.get(current.resource_type.as_str()) else {
                warn!(address = %address, "Unknown resource type in state, skipping");
                continue;
            };

            match resource
                .read(&current.attributes)
                .await
                .map_err(|e| with_address(&address, e))?
            {
                Some(attributes) => {
                    let mut refreshed = current;
                    refreshed.id = resource.id_of(&attributes);
                    refreshed.attributes = attributes;
                    state.insert(address, refreshed);
                    summary.refreshed += 1;
                }
                None => {
                    state.remove(&address);
                    summary.removed += 1;
                }
            }
        }

        save(state, path)?;
        Ok(summary)
    }

    /// Bring the existing object `id` under management as `address`
    pub async fn import(
        &self,
        document: &Document,
        state: &mut State,
        address: &str,
        id: &str,
        path: Option<&Path>,
    ) -> Result<()> {
        let block = document.resource(address).ok_or_else(|| {
            Error::Config(format!(
                "{address} is not declared, add a resource block before importing"
            ))
        })?;
        if state.get(address).is_some() {
            return Err(Error::State(format!("{address} is already managed")));
        }
        let resource = self
            .provider
            .resource(&block.resource_type)
            .ok_or_else(|| Error::Config(format!("unknown resource type {}", block.resource_type)))?;

        let attributes = resource
            .import(id)
            .await
            .map_err(|e| with_address(address, e))?;
        let mut recorded = ResourceState::new(
            block.resource_type.clone(),
            block.name.clone(),
            resource.id_of(&attributes),
            attributes,
        );
        recorded.dependencies = dependencies(&self.scanner, block).into_iter().collect();
        state.insert(address, recorded);
        save(state, path)?;

        info!(address = %address, id = %id, "Imported resource");
        Ok(())
    }
}

/// Value of a reference: data sources from `data`, resources from
/// `resource`. Unknown values resolve to nothing.
fn lookup<'a, F>(data: &'a BTreeMap<String, Value>, resource: F, reference: &Reference) -> Option<Value>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let object = if reference.data {
        data.get(&reference.address())
    } else {
        resource(&reference.address())
    }?;
    object
        .get(&reference.attribute)
        .filter(|value| !value.is_null() && !is_unknown(value))
        .cloned()
}

fn delete_change(address: &str, prior: &ResourceState) -> Change {
    Change {
        address: address.to_string(),
        resource_type: prior.resource_type.clone(),
        name: prior.name.clone(),
        action: Action::Delete,
        prior: Some(prior.attributes.clone()),
        planned: None,
        config: None,
        replace_paths: Vec::new(),
        dependencies: prior.dependencies.clone(),
    }
}

fn collect(address: &str, diags: Diagnostics, into: &mut Diagnostics) {
    for mut diagnostic in diags {
        diagnostic.summary = format!("{address}: {}", diagnostic.summary);
        into.push(diagnostic);
    }
}

fn fail_on_errors(diagnostics: Diagnostics) -> Result<()> {
    if diagnostics.has_error() {
        let errors: Vec<String> = diagnostics.errors().map(ToString::to_string).collect();
        return Err(Error::Validation(errors.join("\n")));
    }
    Ok(())
}

fn with_address(address: &str, error: Error) -> Error {
    match error {
        Error::NotFound(what) => Error::NotFound(format!("{address}: {what}")),
        Error::Validation(message) => Error::Validation(format!("{address}: {message}")),
        Error::Api { status, message } => Error::Api {
            status,
            message: format!("{address}: {message}"),
        },
        other => other,
    }
}

fn save(state: &mut State, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => state.save(path),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apisix_client::testing::InMemoryAdmin;
    use apisix_client::AdminApi;
    use apisix_config::{load_from_str, ConfigFormat};
    use apisix_core::ObjectKind;
    use serde_json::json;

    const DOCUMENT: &str = r#"
resources:
  - type: apisix_route
    name: api
    config:
      name: api
      uri: "/api/*"
      upstream_id: "${apisix_upstream.backend.id}"
      service_id: "${data.apisix_service.billing.id}"
      desc: "served by ${apisix_upstream.backend.name}"

  - type: apisix_upstream
    name: backend
    config:
      name: backend
      nodes:
        - host: 127.0.0.1
          port: 1980

  - type: apisix_consumer
    name: jack
    config:
      username: jack
      desc: "first consumer"

data:
  - type: apisix_service
    name: billing
    config:
      name: billing
"#;

    async fn setup() -> (Arc<InMemoryAdmin>, Engine, Document) {
        let admin = Arc::new(InMemoryAdmin::new());
        admin
            .seed(ObjectKind::Service, "svc-1", json!({"id": "svc-1", "name": "billing"}))
            .await;
        let client: Arc<dyn AdminApi> = admin.clone();
        let engine = Engine::new(ApisixProvider::with_client(client)).unwrap();
        let document = load_from_str(DOCUMENT, ConfigFormat::Yaml).unwrap();
        (admin, engine, document)
    }

    #[tokio::test]
    async fn test_plan_apply_converges() {
        let (admin, engine, document) = setup().await;
        let mut state = State::new();

        let plan = engine.plan(&document, &state).await.unwrap();
        let addresses: Vec<_> = plan.changes.iter().map(|c| c.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec!["apisix_upstream.backend", "apisix_route.api", "apisix_consumer.jack"]
        );
        assert!(plan.changes.iter().all(|c| c.action == Action::Create));

        let route = plan.change("apisix_route.api").unwrap();
        let planned = route.planned.as_ref().unwrap();
        assert_eq!(planned["service_id"], json!("svc-1"));
        assert_eq!(planned["upstream_id"], json!("${apisix_upstream.backend.id}"));
        assert_eq!(planned["desc"], json!("served by backend"));
        assert_eq!(route.dependencies, vec!["apisix_upstream.backend"]);

        let counts = engine.apply(&plan, &mut state, None).await.unwrap();
        assert_eq!(counts.add, 3);

        let upstream_id = state.get("apisix_upstream.backend").unwrap().id.clone().unwrap();
        let route_id = state.get("apisix_route.api").unwrap().id.clone().unwrap();
        let stored = admin.object(ObjectKind::Route, &route_id).await.unwrap();
        assert_eq!(stored["upstream_id"], json!(upstream_id));
        assert_eq!(stored["service_id"], json!("svc-1"));
        assert!(admin.object(ObjectKind::Consumer, "jack").await.is_some());

        let again = engine.plan(&document, &state).await.unwrap();
        assert!(!again.has_changes(), "{}", engine.render(&again));
    }

    #[tokio::test]
    async fn test_update_replace_and_delete() {
        let (admin, engine, mut document) = setup().await;
        let mut state = State::new();
        let plan = engine.plan(&document, &state).await.unwrap();
        engine.apply(&plan, &mut state, None).await.unwrap();

        let consumer = document
            .resources
            .iter_mut()
            .find(|r| r.address() == "apisix_consumer.jack")
            .unwrap();
        consumer.config.insert("username".to_string(), json!("jill"));
        let upstream = document
            .resources
            .iter_mut()
            .find(|r| r.address() == "apisix_upstream.backend")
            .unwrap();
        upstream.config.insert("desc".to_string(), json!("v2"));
        document.resources.retain(|r| r.address() != "apisix_route.api");

        let plan = engine.plan(&document, &state).await.unwrap();
        assert_eq!(plan.change("apisix_upstream.backend").unwrap().action, Action::Update);
        let consumer = plan.change("apisix_consumer.jack").unwrap();
        assert_eq!(consumer.action, Action::Replace);
        assert_eq!(consumer.replace_paths[0].to_string(), "username");
        assert_eq!(plan.change("apisix_route.api").unwrap().action, Action::Delete);
        assert_eq!(plan.changes.last().unwrap().action, Action::Delete);

        let rendered = engine.render(&plan);
        assert!(rendered.contains("# forces replacement"));
        assert!(rendered.contains("Plan: 1 to add, 1 to change, 2 to destroy."));

        let counts = engine.apply(&plan, &mut state, None).await.unwrap();
        assert_eq!(counts.destroy, 2);
        assert!(admin.object(ObjectKind::Consumer, "jack").await.is_none());
        assert!(admin.object(ObjectKind::Consumer, "jill").await.is_some());
        assert_eq!(admin.count(ObjectKind::Route).await, 0);
        assert!(state.get("apisix_route.api").is_none());
    }

    #[tokio::test]
    async fn test_refresh_drops_deleted_objects() {
        let (admin, engine, document) = setup().await;
        let mut state = State::new();
        let plan = engine.plan(&document, &state).await.unwrap();
        engine.apply(&plan, &mut state, None).await.unwrap();

        admin.delete(ObjectKind::Consumer, "jack").await.unwrap();
        let summary = engine.refresh(&mut state, None).await.unwrap();
        assert_eq!(summary, RefreshSummary { refreshed: 2, removed: 1 });
        assert!(state.get("apisix_consumer.jack").is_none());

        let plan = engine.plan(&document, &state).await.unwrap();
        assert_eq!(plan.change("apisix_consumer.jack").unwrap().action, Action::Create);
    }

    #[tokio::test]
    async fn test_destroy_saves_state() {
        let (admin, engine, document) = setup().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apisix.tfstate");
        let mut state = State::new();

        let plan = engine.plan(&document, &state).await.unwrap();
        engine.apply(&plan, &mut state, Some(&path)).await.unwrap();
        assert_eq!(State::load(&path).unwrap().resources.len(), 3);

        let counts = engine.destroy(&mut state, Some(&path)).await.unwrap();
        assert_eq!(counts.destroy, 3);
        assert_eq!(admin.count(ObjectKind::Upstream).await, 0);
        assert!(State::load(&path).unwrap().resources.is_empty());
    }

    #[tokio::test]
    async fn test_import() {
        let (admin, engine, document) = setup().await;
        admin
            .seed(
                ObjectKind::Upstream,
                "legacy",
                json!({
                    "id": "legacy",
                    "name": "backend",
                    "type": "roundrobin",
                    "pass_host": "pass",
                    "scheme": "http",
                    "hash_on": "vars",
                    "nodes": {"127.0.0.1:1980": 1}
                }),
            )
            .await;
        let mut state = State::new();

        engine
            .import(&document, &mut state, "apisix_upstream.backend", "legacy", None)
            .await
            .unwrap();
        assert_eq!(
            state.get("apisix_upstream.backend").unwrap().id.as_deref(),
            Some("legacy")
        );

        let err = engine
            .import(&document, &mut state, "apisix_upstream.backend", "legacy", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::State(_)));

        let err = engine
            .import(&document, &mut state, "apisix_upstream.other", "legacy", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let plan = engine.plan(&document, &state).await.unwrap();
        assert_eq!(plan.change("apisix_upstream.backend").unwrap().action, Action::NoOp);
    }

    #[tokio::test]
    async fn test_invalid_configuration_is_reported() {
        let (_admin, engine, mut document) = setup().await;
        document.resources[0]
            .config
            .insert("priority".to_string(), json!("high"));
        document.resources[2].config.remove("username");

        let err = engine.plan(&document, &State::new()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("apisix_route.api"), "{message}");
        assert!(message.contains("apisix_consumer.jack"), "{message}");
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let engine = Engine::new(ApisixProvider::new()).unwrap();
        let document = load_from_str(DOCUMENT, ConfigFormat::Yaml).unwrap();
        let err = engine.plan(&document, &State::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotConfigured));
    }
}
