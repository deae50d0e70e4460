//! Adjacency-list graph store.
//!
//! `GraphStore` owns the node → children mapping and is the only way handlers
//! touch topology. Every mutation keeps two invariants by construction:
//!
//! - a child never appears twice in one child list
//! - every child is also a key of the map (the store is closed)
//!
//! Key order is insertion order and is significant for layout.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::key::NodeKey;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GraphStore {
    adjacency: IndexMap<NodeKey, Vec<NodeKey>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a raw adjacency map, dropping repeated children and
    /// adding missing child keys.
    pub fn from_adjacency(raw: IndexMap<NodeKey, Vec<NodeKey>>) -> Self {
        let mut graph = Self::new();
        for (parent, children) in raw {
            graph.add_node(parent.clone());
            for child in children {
                graph.add_edge(&parent, &child);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.adjacency.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.adjacency.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &[NodeKey])> {
        self.adjacency.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Children of `key`, empty when the key is unknown.
    pub fn children(&self, key: &str) -> &[NodeKey] {
        self.adjacency
            .get(key)
            .map(|children| children.as_slice())
            .unwrap_or(&[])
    }

    /// Position of `key` in the key order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.adjacency.get_index_of(key)
    }

    /// Insert a node without edges. Returns false if it already existed.
    pub fn add_node(&mut self, key: impl Into<NodeKey>) -> bool {
        let key = key.into();
        if self.adjacency.contains_key(&key) {
            return false;
        }
        self.adjacency.insert(key, Vec::new());
        true
    }

    /// Add `parent -> child`. Idempotent: returns false if the edge already existed.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> bool {
        if !self.adjacency.contains_key(child) {
            self.adjacency.insert(NodeKey::from(child), Vec::new());
        }
        let children = self.adjacency.entry(NodeKey::from(parent)).or_default();
        if children.iter().any(|c| c == child) {
            return false;
        }
        children.push(NodeKey::from(child));
        true
    }

    /// Remove `parent -> child`. Returns whether the edge existed.
    pub fn remove_edge(&mut self, parent: &str, child: &str) -> bool {
        let Some(children) = self.adjacency.get_mut(parent) else {
            return false;
        };
        let before = children.len();
        children.retain(|c| c != child);
        before != children.len()
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        self.children(parent).iter().any(|c| c == child)
    }

    /// Remove `key` and every reference to it. Metadata is not touched.
    ///
    /// Returns the removed node's children, or `None` if it was not present.
    pub fn remove_node(&mut self, key: &str) -> Option<Vec<NodeKey>> {
        let children = self.adjacency.shift_remove(key)?;
        for list in self.adjacency.values_mut() {
            list.retain(|c| c != key);
        }
        Some(children)
    }

    /// Move `key` from under `from` to under `to`. Does nothing and returns
    /// false when `from -> key` does not exist.
    pub fn move_node(&mut self, key: &str, from: &str, to: &str) -> bool {
        if !self.remove_edge(from, key) {
            return false;
        }
        self.add_edge(to, key);
        true
    }

    /// Replace `old` with `new` in the child list of `parent`, keeping its
    /// position. If `new` is already a child, `old` is simply dropped.
    pub fn replace_child(&mut self, parent: &str, old: &str, new: &str) {
        if !self.adjacency.contains_key(new) {
            self.adjacency.insert(NodeKey::from(new), Vec::new());
        }
        let Some(children) = self.adjacency.get_mut(parent) else {
            return;
        };
        let Some(pos) = children.iter().position(|c| c == old) else {
            return;
        };
        if children.iter().any(|c| c == new) {
            children.remove(pos);
        } else {
            children[pos] = NodeKey::from(new);
        }
    }

    /// Every node listing `key` as a child, in key order.
    pub fn parents_of(&self, key: &str) -> Vec<NodeKey> {
        self.adjacency
            .iter()
            .filter(|(_, children)| children.iter().any(|c| c == key))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    /// Nodes that are nobody's child.
    pub fn roots(&self) -> Vec<&NodeKey> {
        let children: HashSet<&NodeKey> = self.adjacency.values().flatten().collect();
        self.adjacency
            .keys()
            .filter(|key| !children.contains(key))
            .collect()
    }

    pub fn is_root(&self, key: &str) -> bool {
        self.contains(key) && !self.adjacency.values().flatten().any(|c| c == key)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&NodeKey, &NodeKey)> {
        self.adjacency
            .iter()
            .flat_map(|(parent, children)| children.iter().map(move |child| (parent, child)))
    }

    /// Stable reorder of the keys by `rank` (lower first).
    pub fn sort_keys_by_rank<F>(&mut self, mut rank: F)
    where
        F: FnMut(&NodeKey) -> usize,
    {
        self.adjacency
            .sort_by(|k1, _, k2, _| rank(k1).cmp(&rank(k2)));
    }

    /// A copy restricted to `keep`; edges leaving the set are dropped.
    pub fn subgraph(&self, keep: &HashSet<NodeKey>) -> GraphStore {
        let adjacency = self
            .adjacency
            .iter()
            .filter(|(key, _)| keep.contains(*key))
            .map(|(key, children)| {
                let children = children
                    .iter()
                    .filter(|c| keep.contains(*c))
                    .cloned()
                    .collect();
                (key.clone(), children)
            })
            .collect();
        GraphStore { adjacency }
    }
}

impl<'de> Deserialize<'de> for GraphStore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<NodeKey, Vec<NodeKey>>::deserialize(deserializer)?;
        Ok(GraphStore::from_adjacency(raw))
    }
}
