//! Per-node metadata.
//!
//! Every node carries three required fields (`count`, `provider`, `type`) and an
//! open, ordered set of attributes. Handlers add attributes freely but must keep
//! the ones they do not understand.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::NodeKey;
use crate::node_factory::NodeResolution;

/// Variant chosen by variant detection.
pub const ATTR_VARIANT: &str = "variant";
/// Label override from the annotation overlay.
pub const ATTR_DISPLAY_LABEL: &str = "display_label";
/// Icon override from the annotation overlay.
pub const ATTR_DISPLAY_ICON: &str = "display_icon";
/// Set on nodes the overlay asks to hide.
pub const ATTR_HIDDEN: &str = "hidden";
/// Set on nodes the engine created (auto-annotation and overlay targets).
pub const ATTR_SYNTHETIC: &str = "synthetic";
/// Set on wrapper nodes once reversal re-parented their wrapped resources.
pub const ATTR_WRAPPED: &str = "wrapped";

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:module\.[A-Za-z0-9_-]+(?:\[[^\]]*\])?\.)*(?:data\.)?[a-z][a-z0-9]*_[a-z0-9_]+\.[A-Za-z0-9_-]+(?:~[0-9]+)?",
    )
    .expect("reference pattern is valid")
});

/// Extract the node key a metadata value refers to.
///
/// Accepts the forms the parser emits: `aws_vpc.main`, `aws_vpc.main.id`,
/// `${aws_vpc.main.id}` and module-prefixed variants.
pub fn reference_target(value: &str) -> Option<NodeKey> {
    REFERENCE
        .find(value)
        .map(|m| NodeKey::from(m.as_str()))
}

/// Every node key referenced by a JSON value (strings and arrays of strings).
pub fn reference_targets(value: &Value) -> Vec<NodeKey> {
    match value {
        Value::String(s) => reference_target(s).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(reference_targets).collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Repeat count as of expansion. Zero means the field was missing.
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub provider: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<NodeResolution>,
    #[serde(flatten)]
    pub attrs: IndexMap<String, Value>,
}

impl NodeMeta {
    pub fn new(provider: impl Into<String>, resource_type: impl Into<String>, count: u32) -> Self {
        Self {
            count,
            provider: provider.into(),
            resource_type: resource_type.into(),
            resolution: None,
            attrs: IndexMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }

    pub fn attr_bool(&self, name: &str) -> bool {
        self.attrs
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<Value> {
        self.attrs.shift_remove(name)
    }

    pub fn variant(&self) -> Option<&str> {
        self.attr_str(ATTR_VARIANT)
    }

    /// Created by the engine rather than read from the input.
    pub fn is_synthetic(&self) -> bool {
        self.attr_bool(ATTR_SYNTHETIC)
    }

    /// The node key `field` points at, if the field holds a reference.
    pub fn reference(&self, field: &str) -> Option<NodeKey> {
        self.attrs
            .get(field)
            .and_then(|v| reference_targets(v).into_iter().next())
    }

    /// Names of required fields that are missing.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.count == 0 {
            missing.push("count");
        }
        if self.provider.is_empty() {
            missing.push("provider");
        }
        if self.resource_type.is_empty() {
            missing.push("type");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_required().is_empty()
    }
}

/// Node key → metadata, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: IndexMap<NodeKey, NodeMeta>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&NodeMeta> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut NodeMeta> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<NodeKey>, meta: NodeMeta) -> Option<NodeMeta> {
        self.entries.insert(key.into(), meta)
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeMeta> {
        self.entries.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeKey, &NodeMeta)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&NodeKey, &mut NodeMeta)> {
        self.entries.iter_mut()
    }

    /// Resource type recorded for `key`, falling back to the type encoded in the key.
    pub fn resource_type<'a>(&'a self, key: &'a NodeKey) -> &'a str {
        self.entries
            .get(key)
            .map(|m| m.resource_type.as_str())
            .filter(|ty| !ty.is_empty())
            .unwrap_or_else(|| key.resource_type())
    }
}
