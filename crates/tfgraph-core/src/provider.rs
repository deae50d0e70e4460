//! Provider descriptors and the `Provider` trait.
//!
//! Each cloud provider crate implements [`Provider`] once. The registry selects
//! the implementation by name or by resource-key prefix, so call sites never
//! re-derive the provider from string prefixes themselves.

use std::path::PathBuf;

use tfgraph_error::{Error, ErrorKind, Result};

use crate::handler::HandlerSequence;

/// Optional features a provider supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// The annotation overlay may be applied to this provider's graph.
    pub annotations: bool,
    /// Remote module sources can be fetched for this provider's configurations.
    pub remote_modules: bool,
}

/// Where a provider's configuration is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// TOML text compiled into the binary.
    Embedded(&'static str),
    /// TOML file read when the provider context is first built.
    File(PathBuf),
}

impl ConfigSource {
    /// Human readable identifier used in logs and errors.
    pub fn identifier(&self) -> String {
        match self {
            ConfigSource::Embedded(_) => "<embedded>".to_string(),
            ConfigSource::File(path) => path.display().to_string(),
        }
    }

    pub fn load(&self) -> Result<String> {
        match self {
            ConfigSource::Embedded(text) => Ok((*text).to_string()),
            ConfigSource::File(path) => std::fs::read_to_string(path).map_err(|err| {
                Error::new(
                    ErrorKind::ConfigInvalid,
                    format!("cannot read provider configuration: {err}"),
                )
                .with_operation("provider::load_config")
                .with_context("path", path.display().to_string())
                .set_source(err)
            }),
        }
    }
}

/// Immutable identity record of one provider.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    /// Canonical id, e.g. `aws`.
    pub name: &'static str,
    pub display_name: &'static str,
    /// Resource type prefix used for detection, e.g. `aws_`.
    pub prefix: &'static str,
    pub config: ConfigSource,
    /// Namespace of renderable classes, e.g. `resource_classes.aws`.
    pub class_namespace: &'static str,
    /// Directory of icons, e.g. `icons/aws`.
    pub icon_namespace: &'static str,
    pub capabilities: Capabilities,
    pub aliases: &'static [&'static str],
}

impl ProviderDescriptor {
    /// Canonical name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    /// Whether `resource_type` belongs to this provider by prefix.
    pub fn matches(&self, resource_type: &str) -> bool {
        !self.prefix.is_empty() && resource_type.starts_with(self.prefix)
    }
}

/// A renderable class reference from a provider's class table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRef {
    pub class: String,
    pub icon: String,
}

/// One cloud provider: identity, handler pipeline and class table.
pub trait Provider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// The provider's handlers in their declared order.
    fn handlers(&self) -> Result<HandlerSequence>;

    /// Resource type → class name entries.
    fn class_table(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Resource type → `domain.subdomain` entries contributed to the service mapping.
    fn service_categories(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Resolve a resource type (or variant name) to a class in this provider's namespace.
    fn resolve_class(&self, resource_type: &str) -> Option<ClassRef> {
        let descriptor = self.descriptor();
        self.class_table()
            .iter()
            .find(|(ty, _)| *ty == resource_type)
            .map(|(ty, class)| ClassRef {
                class: format!("{}.{}", descriptor.class_namespace, class),
                icon: format!("{}/{}.png", descriptor.icon_namespace, ty),
            })
    }
}
