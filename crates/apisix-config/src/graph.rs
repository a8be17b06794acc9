//! Dependencies between resources

use crate::reference::ReferenceScanner;
use crate::types::{Document, ResourceBlock};
use apisix_core::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Addresses of the resources `resource` depends on, explicit
/// `depends_on` entries plus the resources its configuration references.
/// Data sources are read before any resource and are not included.
pub fn dependencies(scanner: &ReferenceScanner, resource: &ResourceBlock) -> BTreeSet<String> {
    let mut dependencies: BTreeSet<String> = resource.depends_on.iter().cloned().collect();
    dependencies.extend(
        scanner
            .in_value(&Value::Object(resource.config.clone()))
            .into_iter()
            .filter(|reference| !reference.data)
            .map(|reference| reference.address()),
    );
    dependencies.remove(&resource.address());
    dependencies
}

/// Resource indices in an order where every resource comes after the
/// resources it depends on. Ties keep document order. Dependencies on
/// addresses outside the document are ignored here; the validator reports
/// them.
pub fn dependency_order(document: &Document) -> Result<Vec<usize>> {
    let scanner = ReferenceScanner::new()?;
    let index: BTreeMap<String, usize> = document
        .resources
        .iter()
        .enumerate()
        .map(|(i, r)| (r.address(), i))
        .collect();

    let edges: Vec<BTreeSet<usize>> = document
        .resources
        .iter()
        .map(|resource| {
            dependencies(&scanner, resource)
                .iter()
                .filter_map(|address| index.get(address).copied())
                .collect()
        })
        .collect();

    let mut order = Vec::with_capacity(edges.len());
    let mut placed = vec![false; edges.len()];
    while order.len() < edges.len() {
        let next = (0..edges.len())
            .find(|&i| !placed[i] && edges[i].iter().all(|&dep| placed[dep]));
        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => {
                let cycle: Vec<String> = (0..edges.len())
                    .filter(|&i| !placed[i])
                    .map(|i| document.resources[i].address())
                    .collect();
                return Err(Error::Config(format!(
                    "Dependency cycle between: {}",
                    cycle.join(", ")
                )));
            }
        }
    }
    Ok(order)
}
