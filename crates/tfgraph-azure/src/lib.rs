//! Microsoft Azure provider.
//!
//! Handler order:
//!
//! 1. consolidate DNS and Log Analytics families
//! 2. expand counted resources
//! 3. eliminate security group, NAT gateway and backend pool associations
//! 4. group subnets under virtual networks, then virtual networks under
//!    resource groups
//! 5. reverse network security groups
//! 6. load balancer SKU and storage account kind variants
//! 7. auto-annotations, user overlay, draw order

mod classes;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use tfgraph_core::handlers::{
    ApplyDrawOrder, ApplyOverlay, AutoAnnotate, Consolidate, DetectVariants,
    EliminateIntermediary, ExpandInstances, Group, Reverse,
};
use tfgraph_core::{
    Capabilities, ConfigSource, Handler, HandlerSequence, Provider, ProviderDescriptor, Result,
};

pub use classes::{CLASSES, SERVICES};

pub const NAME: &str = "azure";

pub const CONFIG: &str = include_str!("../config/azure.toml");

const INTERMEDIARIES: &[&str] = &[
    "azurerm_subnet_network_security_group_association",
    "azurerm_network_interface_security_group_association",
    "azurerm_subnet_nat_gateway_association",
    "azurerm_network_interface_backend_address_pool_association",
];

/// `(child, parent, parent-pointer field)`; subnets move before their networks do.
const GROUPS: &[(&str, &str, &str)] = &[
    ("azurerm_subnet", "azurerm_virtual_network", "virtual_network_name"),
    ("azurerm_virtual_network", "azurerm_resource_group", "resource_group_name"),
];

const WRAPPERS: &[&str] = &["azurerm_network_security_group"];

#[derive(Debug, Clone)]
pub struct AzureProvider {
    descriptor: ProviderDescriptor,
}

impl Default for AzureProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AzureProvider {
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                name: NAME,
                display_name: "Microsoft Azure",
                prefix: "azurerm_",
                config: ConfigSource::Embedded(CONFIG),
                class_namespace: "resource_classes.azure",
                icon_namespace: "icons/azure",
                capabilities: Capabilities {
                    annotations: true,
                    remote_modules: true,
                },
                aliases: &["azurerm", "microsoft"],
            },
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor.config = ConfigSource::File(path.into());
        self
    }
}

impl Provider for AzureProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn handlers(&self) -> Result<HandlerSequence> {
        let mut handlers: Vec<Box<dyn Handler>> = vec![Box::new(Consolidate), Box::new(ExpandInstances)];
        for ty in INTERMEDIARIES {
            handlers.push(Box::new(EliminateIntermediary::new(*ty)));
        }
        for (child, parent, field) in GROUPS {
            handlers.push(Box::new(Group::new(*child, *parent).via(*field)));
        }
        for ty in WRAPPERS {
            handlers.push(Box::new(Reverse::new(*ty)));
        }
        handlers.push(Box::new(DetectVariants));
        handlers.push(Box::new(AutoAnnotate));
        handlers.push(Box::new(ApplyOverlay));
        handlers.push(Box::new(ApplyDrawOrder));
        let sequence = HandlerSequence::new(handlers)?;
        debug!(provider = NAME, handlers = sequence.len(), "declared handler sequence");
        Ok(sequence)
    }

    fn class_table(&self) -> &'static [(&'static str, &'static str)] {
        CLASSES
    }

    fn service_categories(&self) -> &'static [(&'static str, &'static str)] {
        SERVICES
    }
}

pub fn provider() -> Arc<dyn Provider> {
    Arc::new(AzureProvider::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tfgraph_core::ProviderContext;

    #[test]
    fn test_embedded_config_loads() {
        let cx = ProviderContext::load(AzureProvider::new().descriptor()).unwrap();
        assert_eq!(cx.draw_rank("azurerm_resource_group"), 0);
        assert_eq!(cx.draw_rank("azurerm_storage_account"), 6);
        let rule = cx.variant_rules("azurerm_storage_account").next().unwrap();
        assert_eq!(rule.classify(Some("BlockBlobStorage")), "azurerm_storage_block_blob");
        assert_eq!(rule.classify(Some("StorageV2")), "azurerm_storage_v2");
        assert_eq!(rule.classify(None), "azurerm_storage_v2");
    }

    #[test]
    fn test_subnets_grouped_before_networks() {
        let sequence = AzureProvider::new().handlers().unwrap();
        let names: Vec<(String, _)> = sequence.describe();
        let position = |name: &str| names.iter().position(|(n, _)| n == name).unwrap();
        assert!(
            position("group_azurerm_subnet_under_azurerm_virtual_network")
                < position("group_azurerm_virtual_network_under_azurerm_resource_group")
        );
        assert!(position("reverse_azurerm_network_security_group") < position("detect_variants"));
    }

    #[test]
    fn test_variant_classes_exist() {
        let provider = AzureProvider::new();
        let cx = ProviderContext::load(provider.descriptor()).unwrap();
        for rule in &cx.config().variants {
            assert!(provider.resolve_class(&rule.default).is_some(), "{}", rule.default);
            for variant in rule.values.values() {
                assert!(provider.resolve_class(variant).is_some(), "{variant}");
            }
        }
    }
}
