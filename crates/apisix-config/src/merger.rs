//! Document merging
//!
//! Several documents can describe one deployment: a base document with the
//! shared objects plus environment-specific ones. Later documents override
//! earlier ones per block address; new blocks are appended in the order
//! they first appear.

use crate::types::{DataBlock, Document, ProviderBlock, ResourceBlock};
use apisix_core::{Error, Result};

/// Merge documents, later ones winning
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    let mut documents = documents.into_iter();
    let mut result = documents
        .next()
        .ok_or_else(|| Error::Config("No documents to merge".to_string()))?;

    for document in documents {
        result = merge_two_documents(result, document);
    }

    Ok(result)
}

fn merge_two_documents(base: Document, overlay: Document) -> Document {
    Document {
        provider: merge_provider(base.provider, overlay.provider),
        resources: merge_resources(base.resources, overlay.resources),
        data: merge_data(base.data, overlay.data),
    }
}

/// Fields set in the overlay win
fn merge_provider(base: ProviderBlock, overlay: ProviderBlock) -> ProviderBlock {
    ProviderBlock {
        endpoint: overlay.endpoint.or(base.endpoint),
        api_key: overlay.api_key.or(base.api_key),
        timeout: overlay.timeout.or(base.timeout),
        retry_attempts: overlay.retry_attempts.or(base.retry_attempts),
    }
}

fn merge_resources(mut base: Vec<ResourceBlock>, overlay: Vec<ResourceBlock>) -> Vec<ResourceBlock> {
    for resource in overlay {
        let address = resource.address();
        match base.iter_mut().find(|r| r.address() == address) {
            Some(existing) => *existing = resource,
            None => base.push(resource),
        }
    }
    base
}

fn merge_data(mut base: Vec<DataBlock>, overlay: Vec<DataBlock>) -> Vec<DataBlock> {
    for data in overlay {
        let address = data.address();
        match base.iter_mut().find(|d| d.address() == address) {
            Some(existing) => *existing = data,
            None => base.push(data),
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use std::time::Duration;

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn document(endpoint: Option<&str>, resources: Vec<ResourceBlock>) -> Document {
        Document {
            provider: ProviderBlock {
                endpoint: endpoint.map(str::to_string),
                ..Default::default()
            },
            resources,
            data: vec![],
        }
    }

    #[test]
    fn test_provider_overlay() {
        let mut base = document(Some("http://base:9180/apisix/admin"), vec![]);
        base.provider.timeout = Some(Duration::from_secs(5));
        let overlay = document(Some("http://prod:9180/apisix/admin"), vec![]);

        let merged = merge_documents(vec![base, overlay]).unwrap();
        assert_eq!(
            merged.provider.endpoint.as_deref(),
            Some("http://prod:9180/apisix/admin")
        );
        assert_eq!(merged.provider.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_resources_by_address() {
        let base = document(
            None,
            vec![
                ResourceBlock::new("apisix_upstream", "backend", config(json!({"type": "roundrobin"}))),
                ResourceBlock::new("apisix_route", "api", config(json!({"uri": "/api"}))),
            ],
        );
        let overlay = document(
            None,
            vec![
                ResourceBlock::new("apisix_upstream", "backend", config(json!({"type": "chash"}))),
                ResourceBlock::new("apisix_consumer", "jack", config(json!({"username": "jack"}))),
            ],
        );

        let merged = merge_documents(vec![base, overlay]).unwrap();
        let addresses: Vec<_> = merged.resources.iter().map(ResourceBlock::address).collect();
        assert_eq!(
            addresses,
            vec!["apisix_upstream.backend", "apisix_route.api", "apisix_consumer.jack"]
        );
        assert_eq!(merged.resources[0].config["type"], json!("chash"));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_documents(vec![]).is_err());
    }
}
