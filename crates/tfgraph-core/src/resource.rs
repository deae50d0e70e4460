//! The graph + metadata pair every handler mutates, and its consistency checks.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::key::NodeKey;
use crate::meta::{Metadata, NodeMeta};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub graph: GraphStore,
    #[serde(rename = "metadata")]
    pub meta: Metadata,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(graph: GraphStore, meta: Metadata) -> Self {
        Self { graph, meta }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Add a node together with its metadata. Existing metadata is replaced.
    pub fn insert_node(&mut self, key: impl Into<NodeKey>, meta: NodeMeta) {
        let key = key.into();
        self.graph.add_node(key.clone());
        self.meta.insert(key, meta);
    }

    /// Remove a node from the graph and drop its metadata.
    pub fn remove_resource(&mut self, key: &str) -> Option<NodeMeta> {
        self.graph.remove_node(key);
        self.meta.remove(key)
    }

    pub fn resource_type<'a>(&'a self, key: &'a NodeKey) -> &'a str {
        self.meta.resource_type(key)
    }

    /// Graph keys whose resource type is exactly `resource_type`, in key order.
    pub fn keys_of_type(&self, resource_type: &str) -> Vec<NodeKey> {
        self.graph
            .keys()
            .filter(|key| self.resource_type(key) == resource_type)
            .cloned()
            .collect()
    }

    /// Graph keys whose resource type starts with `prefix`, in key order.
    pub fn keys_with_type_prefix(&self, prefix: &str) -> Vec<NodeKey> {
        self.graph
            .keys()
            .filter(|key| self.resource_type(key).starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Describe every inconsistency between graph and metadata. Never fails.
    ///
    /// `parent_fields` names the metadata fields that point at a parent node
    /// (e.g. `vpc_id`); a pointer to a key absent from the graph is reported.
    pub fn validate(&self, parent_fields: &[String]) -> Vec<String> {
        let mut issues = self.metadata_defects();
        for (key, meta) in self.meta.iter() {
            if !self.graph.contains(key) {
                continue;
            }
            for field in parent_fields {
                if let Some(target) = meta.reference(field)
                    && !self.graph.contains(&target)
                {
                    issues.push(format!(
                        "'{key}' field '{field}' references '{target}' which is not in the graph"
                    ));
                }
            }
        }
        issues
    }

    /// Missing or incomplete metadata, and metadata without a node.
    pub fn metadata_defects(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut seen: HashSet<&NodeKey> = HashSet::new();
        let nodes = self
            .graph
            .iter()
            .flat_map(|(key, children)| std::iter::once(key).chain(children.iter()));
        for key in nodes {
            if !seen.insert(key) {
                continue;
            }
            match self.meta.get(key) {
                None => issues.push(format!("node '{key}' has no metadata")),
                Some(meta) => {
                    for field in meta.missing_required() {
                        issues.push(format!(
                            "metadata for '{key}' is missing required field '{field}'"
                        ));
                    }
                }
            }
        }
        for key in self.meta.keys() {
            if !self.graph.contains(key) {
                issues.push(format!("metadata entry '{key}' has no graph node"));
            }
        }
        issues
    }

    /// A copy restricted to `keep`, with edges leaving the set dropped.
    pub fn subgraph(&self, keep: &HashSet<NodeKey>) -> ResourceGraph {
        let graph = self.graph.subgraph(keep);
        let mut meta = Metadata::new();
        for (key, entry) in self.meta.iter() {
            if keep.contains(key) {
                meta.insert(key.clone(), entry.clone());
            }
        }
        ResourceGraph { graph, meta }
    }

    /// Append every node, edge and metadata entry of `other`.
    ///
    /// Synthetic entries never replace real ones. A synthetic node named after
    /// the base of expanded instances is dropped with its edges, whichever
    /// side it comes from.
    pub fn merge(&mut self, other: ResourceGraph) {
        let phantoms: HashSet<NodeKey> = {
            let expanded: HashSet<&str> = self
                .graph
                .keys()
                .chain(other.graph.keys())
                .filter(|key| key.is_instance())
                .map(|key| key.base())
                .collect();
            self.meta
                .iter()
                .chain(other.meta.iter())
                .filter(|(key, meta)| meta.is_synthetic() && expanded.contains(key.as_str()))
                .map(|(key, _)| key.clone())
                .collect()
        };

        for key in &phantoms {
            self.remove_resource(key);
        }
        for (key, children) in other.graph.iter() {
            if phantoms.contains(key) {
                continue;
            }
            self.graph.add_node(key.clone());
            for child in children.iter().filter(|c| !phantoms.contains(*c)) {
                self.graph.add_edge(key, child);
            }
        }
        for (key, meta) in other.meta.iter() {
            if phantoms.contains(key) {
                continue;
            }
            let keep_existing = meta.is_synthetic()
                && self.meta.get(key).is_some_and(|existing| !existing.is_synthetic());
            if !keep_existing {
                self.meta.insert(key.clone(), meta.clone());
            }
        }
    }
}
