//! Node keys: `<resource_type>.<name>` with an optional `~<index>` instance suffix.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Separator between a key and its 1-based instance index.
pub const INSTANCE_SEPARATOR: char = '~';

const MODULE_PREFIX: &str = "module.";
const DATA_PREFIX: &str = "data.";

/// Unique identity of one graph node.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_parts(resource_type: &str, name: &str) -> Self {
        Self(format!("{resource_type}.{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key without any `module.<name>.` prefixes.
    pub fn strip_module_prefix(&self) -> &str {
        strip_module_prefix(&self.0)
    }

    /// The resource type, e.g. `aws_instance` for `module.app.aws_instance.web~2`.
    pub fn resource_type(&self) -> &str {
        resource_type_of(&self.0)
    }

    /// The resource name without type, module path or instance suffix.
    pub fn name(&self) -> &str {
        let local = strip_module_prefix(self.base());
        let local = local.strip_prefix(DATA_PREFIX).unwrap_or(local);
        local.split_once('.').map(|(_, name)| name).unwrap_or("")
    }

    /// The key without its instance suffix.
    pub fn base(&self) -> &str {
        split_instance(&self.0).0
    }

    /// The 1-based instance index, if this key is an expanded instance.
    pub fn instance(&self) -> Option<usize> {
        split_instance(&self.0).1
    }

    pub fn is_instance(&self) -> bool {
        self.instance().is_some()
    }

    /// Build the key of instance `index` of this key's base.
    pub fn with_instance(&self, index: usize) -> NodeKey {
        NodeKey(format!("{}{}{}", self.base(), INSTANCE_SEPARATOR, index))
    }
}

/// Strip any number of leading `module.<name>.` segments.
pub fn strip_module_prefix(key: &str) -> &str {
    let mut rest = key;
    while let Some(after) = rest.strip_prefix(MODULE_PREFIX) {
        match after.find('.') {
            Some(dot) => rest = &after[dot + 1..],
            None => break,
        }
    }
    rest
}

/// Resource type of a raw key string.
pub fn resource_type_of(key: &str) -> &str {
    let local = strip_module_prefix(key);
    let local = local.strip_prefix(DATA_PREFIX).unwrap_or(local);
    local.split_once('.').map(|(ty, _)| ty).unwrap_or(local)
}

fn split_instance(key: &str) -> (&str, Option<usize>) {
    if let Some((base, index)) = key.rsplit_once(INSTANCE_SEPARATOR)
        && !index.is_empty()
        && index.bytes().all(|b| b.is_ascii_digit())
        && let Ok(index) = index.parse::<usize>()
        && index > 0
    {
        return (base, Some(index));
    }
    (key, None)
}

impl Borrow<str> for NodeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Deref for NodeKey {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&NodeKey> for NodeKey {
    fn from(value: &NodeKey) -> Self {
        value.clone()
    }
}

impl PartialEq<str> for NodeKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_key_parts() {
        let key = NodeKey::from("aws_instance.web");
        assert_eq!(key.resource_type(), "aws_instance");
        assert_eq!(key.name(), "web");
        assert_eq!(key.base(), "aws_instance.web");
        assert_eq!(key.instance(), None);
    }

    #[test]
    fn test_module_and_instance() {
        let key = NodeKey::from("module.net.module.inner.aws_subnet.private~3");
        assert_eq!(key.strip_module_prefix(), "aws_subnet.private~3");
        assert_eq!(key.resource_type(), "aws_subnet");
        assert_eq!(key.name(), "private");
        assert_eq!(key.instance(), Some(3));
        assert_eq!(
            key.with_instance(1).as_str(),
            "module.net.module.inner.aws_subnet.private~1"
        );
    }

    #[test]
    fn test_data_source_type() {
        let key = NodeKey::from("data.aws_iam_policy_document.assume");
        assert_eq!(key.resource_type(), "aws_iam_policy_document");
        assert_eq!(key.name(), "assume");
    }

    #[test]
    fn test_zero_suffix_is_not_an_instance() {
        let key = NodeKey::from("aws_instance.web~0");
        assert_eq!(key.instance(), None);
        assert!(!key.is_instance());
        assert_eq!(key.base(), "aws_instance.web~0");
        assert_eq!(NodeKey::from("aws_instance.web~01").instance(), Some(1));
    }

    #[test]
    fn test_non_numeric_suffix_is_not_an_instance() {
        let key = NodeKey::from("aws_instance.a~b");
        assert_eq!(key.instance(), None);
        assert_eq!(key.base(), "aws_instance.a~b");
    }
}
