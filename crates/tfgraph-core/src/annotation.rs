//! In-memory annotation overlay consumed by the overlay handler.
//!
//! Patterns are either a literal node key or a prefix ending in `*`
//! (`aws_instance.*`, `aws_*`). Nothing richer is supported.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::GraphStore;
use crate::key::NodeKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// A literal key. Also matches the expanded instances of that key.
    Exact(NodeKey),
    /// Every key starting with the prefix, with or without module path.
    Prefix(String),
}

impl KeyPattern {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => KeyPattern::Prefix(prefix.to_string()),
            None => KeyPattern::Exact(NodeKey::from(raw)),
        }
    }

    pub fn matches(&self, key: &NodeKey) -> bool {
        match self {
            KeyPattern::Exact(literal) => key == literal || key.base() == literal.as_str(),
            KeyPattern::Prefix(prefix) => {
                key.as_str().starts_with(prefix.as_str())
                    || key.strip_module_prefix().starts_with(prefix.as_str())
            }
        }
    }

    /// The literal key, for patterns that may name a node not yet in the graph.
    pub fn literal(&self) -> Option<&NodeKey> {
        match self {
            KeyPattern::Exact(key) => Some(key),
            KeyPattern::Prefix(_) => None,
        }
    }

    /// Graph keys matching this pattern, in key order.
    pub fn resolve(&self, graph: &GraphStore) -> Vec<NodeKey> {
        graph.keys().filter(|key| self.matches(key)).cloned().collect()
    }
}

/// User directives applied on top of the transformed graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationOverlay {
    /// `[from, to]` pattern pairs to connect.
    pub add_edges: Vec<(String, String)>,
    /// `[from, to]` pattern pairs to disconnect.
    pub remove_edges: Vec<(String, String)>,
    /// Pattern → display label.
    pub labels: IndexMap<String, String>,
    /// Pattern → icon path.
    pub icons: IndexMap<String, String>,
    /// Patterns of nodes to hide.
    pub hidden: Vec<String>,
}

impl AnnotationOverlay {
    pub fn is_empty(&self) -> bool {
        self.add_edges.is_empty()
            && self.remove_edges.is_empty()
            && self.labels.is_empty()
            && self.icons.is_empty()
            && self.hidden.is_empty()
    }

    pub fn with_edge(mut self, from: &str, to: &str) -> Self {
        self.add_edges.push((from.to_string(), to.to_string()));
        self
    }

    pub fn without_edge(mut self, from: &str, to: &str) -> Self {
        self.remove_edges.push((from.to_string(), to.to_string()));
        self
    }

    pub fn with_label(mut self, pattern: &str, label: &str) -> Self {
        self.labels.insert(pattern.to_string(), label.to_string());
        self
    }

    pub fn with_icon(mut self, pattern: &str, icon: &str) -> Self {
        self.icons.insert(pattern.to_string(), icon.to_string());
        self
    }

    pub fn with_hidden(mut self, pattern: &str) -> Self {
        self.hidden.push(pattern.to_string());
        self
    }
}
