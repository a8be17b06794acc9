//! In-memory Admin API for tests

use crate::api::{AdminApi, ApiObject};
use apisix_core::{Error, ObjectKind, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Operation recorded by [`InMemoryAdmin`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `get`
    Get(ObjectKind, String),
    /// `list`
    List(ObjectKind),
    /// `create`, with the assigned id
    Create(ObjectKind, String),
    /// `put`
    Put(ObjectKind, String),
    /// `delete`
    Delete(ObjectKind, String),
}

#[derive(Debug, Default)]
struct Store {
    objects: BTreeMap<(ObjectKind, String), Map<String, Value>>,
    calls: Vec<Call>,
    next_id: u64,
}

/// Admin API kept in memory.
///
/// Stores objects the way APISIX does: the identity field is added to the
/// body and a bumped `update_time` is stored with every write.
#[derive(Debug, Default)]
pub struct InMemoryAdmin {
    store: Mutex<Store>,
}

impl InMemoryAdmin {
    /// Empty Admin API
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object as if it had been created outside the provider
    pub async fn seed(&self, kind: ObjectKind, id: &str, value: Value) {
        let mut store = self.store.lock().await;
        let mut object = value.as_object().cloned().unwrap_or_default();
        object.insert(kind.id_field().to_string(), Value::String(id.to_string()));
        store.objects.insert((kind, id.to_string()), object);
    }

    /// Current body of an object
    pub async fn object(&self, kind: ObjectKind, id: &str) -> Option<Map<String, Value>> {
        self.store.lock().await.objects.get(&(kind, id.to_string())).cloned()
    }

    /// Number of stored objects of a kind
    pub async fn count(&self, kind: ObjectKind) -> usize {
        let store = self.store.lock().await;
        store.objects.keys().filter(|(k, _)| *k == kind).count()
    }

    /// Every operation performed so far
    pub async fn calls(&self) -> Vec<Call> {
        self.store.lock().await.calls.clone()
    }

    fn write(store: &mut Store, kind: ObjectKind, id: &str, body: &Map<String, Value>) -> ApiObject {
        store.next_id += 1;
        let mut value = body.clone();
        value.insert(kind.id_field().to_string(), Value::String(id.to_string()));
        value.insert("update_time".to_string(), Value::from(store.next_id));
        store.objects.insert((kind, id.to_string()), value.clone());
        ApiObject {
            id: id.to_string(),
            value,
        }
    }
}

#[async_trait]
impl AdminApi for InMemoryAdmin {
    async fn get(&self, kind: ObjectKind, id: &str) -> Result<ApiObject> {
        let mut store = self.store.lock().await;
        store.calls.push(Call::Get(kind, id.to_string()));
        store
            .objects
            .get(&(kind, id.to_string()))
            .map(|value| ApiObject {
                id: id.to_string(),
                value: value.clone(),
            })
            .ok_or_else(|| Error::NotFound(format!("{kind}/{id}")))
    }

    async fn list(&self, kind: ObjectKind) -> Result<Vec<ApiObject>> {
        let mut store = self.store.lock().await;
        store.calls.push(Call::List(kind));
        Ok(store
            .objects
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), value)| ApiObject {
                id: id.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn create(&self, kind: ObjectKind, body: &Map<String, Value>) -> Result<ApiObject> {
        let mut store = self.store.lock().await;
        let id = format!("{:020}", store.next_id + 1);
        store.calls.push(Call::Create(kind, id.clone()));
        Ok(Self::write(&mut store, kind, &id, body))
    }

    async fn put(&self, kind: ObjectKind, id: &str, body: &Map<String, Value>) -> Result<ApiObject> {
        let mut store = self.store.lock().await;
        store.calls.push(Call::Put(kind, id.to_string()));
        Ok(Self::write(&mut store, kind, id, body))
    }

    async fn delete(&self, kind: ObjectKind, id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.calls.push(Call::Delete(kind, id.to_string()));
        store
            .objects
            .remove(&(kind, id.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("{kind}/{id}")))
    }
}
