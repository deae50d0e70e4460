//! Loaded per-provider configuration.
//!
//! A [`ProviderContext`] is built from a provider's TOML configuration the first
//! time the registry is asked for it. Four collections are required
//! (`consolidated`, `draw_order`, `variants`, `auto_annotations`); a source that
//! lacks one of them, or contains a malformed rule, fails construction.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::Deserialize;
use tracing::debug;

use tfgraph_error::{Error, ErrorKind, Result};

use crate::key::NodeKey;
use crate::provider::ProviderDescriptor;

/// Every resource whose type starts with `prefix` is merged into `target`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConsolidationRule {
    pub prefix: String,
    pub target: NodeKey,
}

/// Maps a metadata field of one resource type onto a named variant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VariantRule {
    pub resource: String,
    pub field: String,
    /// Variant used when the field is missing or matches nothing.
    pub default: String,
    /// Keyword (matched case-insensitively) → variant name.
    pub values: BTreeMap<String, String>,
}

impl VariantRule {
    /// Pick the variant for a field value. Exact keyword matches win over
    /// substring matches; keywords are tried in sorted order.
    pub fn classify(&self, value: Option<&str>) -> &str {
        let Some(value) = value else {
            return &self.default;
        };
        let value = value.to_ascii_lowercase();
        if let Some((_, variant)) = self
            .values
            .iter()
            .find(|(keyword, _)| keyword.to_ascii_lowercase() == value)
        {
            return variant;
        }
        self.values
            .iter()
            .find(|(keyword, _)| value.contains(&keyword.to_ascii_lowercase()))
            .map(|(_, variant)| variant.as_str())
            .unwrap_or(&self.default)
    }
}

/// Implicit edges inferred from a resource type alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutoAnnotationRule {
    /// Resource type prefix the rule applies to.
    pub source: String,
    /// Nodes to connect; created as synthetic nodes when absent.
    pub link: Vec<NodeKey>,
    /// Draw `link -> source` instead of `source -> link`.
    #[serde(default)]
    pub reverse: bool,
}

/// Raw provider configuration as stored in TOML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    pub consolidated: Vec<ConsolidationRule>,
    pub draw_order: Vec<Vec<String>>,
    pub variants: Vec<VariantRule>,
    pub auto_annotations: Vec<AutoAnnotationRule>,
    /// Metadata fields that point at a parent node (e.g. `vpc_id`).
    #[serde(default)]
    pub parent_fields: Vec<String>,
}

impl ProviderConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: ProviderConfig = toml::from_str(text).map_err(|err| {
            Error::new(ErrorKind::ConfigInvalid, err.message().to_string())
                .with_operation("context::parse")
                .set_source(err)
        })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for rule in &self.consolidated {
            if rule.prefix.is_empty() {
                return Err(Error::config_invalid("consolidation rule with empty prefix"));
            }
            if rule.target.name().is_empty() {
                return Err(Error::config_invalid(format!(
                    "consolidation target '{}' is not a '<type>.<name>' key",
                    rule.target
                )));
            }
        }
        for rule in &self.variants {
            if rule.resource.is_empty() || rule.field.is_empty() || rule.default.is_empty() {
                return Err(Error::config_invalid(format!(
                    "variant rule for '{}' needs resource, field and default",
                    rule.resource
                )));
            }
        }
        for rule in &self.auto_annotations {
            if rule.source.is_empty() || rule.link.is_empty() {
                return Err(Error::config_invalid(
                    "auto-annotation rule needs a source and at least one link",
                ));
            }
            if let Some(bad) = rule.link.iter().find(|k| k.name().is_empty()) {
                return Err(Error::config_invalid(format!(
                    "auto-annotation link '{bad}' is not a '<type>.<name>' key"
                )));
            }
        }
        Ok(())
    }
}

/// Loaded, validated configuration of one provider.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    provider: &'static str,
    source: String,
    revision: u64,
    config: ProviderConfig,
}

impl ProviderContext {
    /// Load and validate the configuration named by `descriptor`.
    pub fn load(descriptor: &ProviderDescriptor) -> Result<Self> {
        let text = descriptor.config.load()?;
        Self::from_toml(descriptor.name, &text)
            .map_err(|err| {
                err.with_operation("context::load")
                    .with_context("provider", descriptor.name)
                    .with_context("source", descriptor.config.identifier())
            })
            .map(|mut cx| {
                cx.source = descriptor.config.identifier();
                cx
            })
    }

    pub fn from_toml(provider: &'static str, text: &str) -> Result<Self> {
        let config = ProviderConfig::from_toml(text)?;
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let revision = hasher.finish();
        debug!(
            provider,
            revision,
            consolidated = config.consolidated.len(),
            variants = config.variants.len(),
            auto_annotations = config.auto_annotations.len(),
            "provider context built"
        );
        Ok(Self {
            provider,
            source: "<inline>".to_string(),
            revision,
            config,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fingerprint of the configuration text; changes whenever the configuration does.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn parent_fields(&self) -> &[String] {
        &self.config.parent_fields
    }

    /// The consolidation rule with the longest prefix matching `resource_type`.
    pub fn consolidation_rule(&self, resource_type: &str) -> Option<&ConsolidationRule> {
        self.config
            .consolidated
            .iter()
            .filter(|rule| resource_type.starts_with(&rule.prefix))
            .max_by_key(|rule| rule.prefix.len())
    }

    /// Keys of the consolidated container nodes.
    pub fn consolidation_targets(&self) -> impl Iterator<Item = &NodeKey> {
        self.config.consolidated.iter().map(|rule| &rule.target)
    }

    /// Z-order rank of a resource type: index of the first draw-order group
    /// with a matching prefix, or the number of groups when none matches.
    pub fn draw_rank(&self, resource_type: &str) -> usize {
        self.config
            .draw_order
            .iter()
            .position(|group| group.iter().any(|p| resource_type.starts_with(p.as_str())))
            .unwrap_or(self.config.draw_order.len())
    }

    pub fn variant_rules(&self, resource_type: &str) -> impl Iterator<Item = &VariantRule> {
        self.config
            .variants
            .iter()
            .filter(move |rule| rule.resource == resource_type)
    }

    pub fn auto_annotations(&self) -> &[AutoAnnotationRule] {
        &self.config.auto_annotations
    }
}
