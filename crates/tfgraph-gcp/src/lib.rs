//! Google Cloud provider.
//!
//! Handler order:
//!
//! 1. consolidate Cloud DNS and logging sinks
//! 2. expand counted resources
//! 3. eliminate IAM members and bindings, unmanaged instance groups
//! 4. group subnetworks under networks, node pools under clusters
//! 5. reverse firewalls
//! 6. forwarding rule scheme and Cloud SQL engine variants
//! 7. auto-annotations, draw order
//!
//! Annotation files are not supported, so no overlay step is declared.

mod classes;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use tfgraph_core::handlers::{
    ApplyDrawOrder, AutoAnnotate, Consolidate, DetectVariants, EliminateIntermediary,
    ExpandInstances, Group, Reverse,
};
use tfgraph_core::{
    Capabilities, ConfigSource, Handler, HandlerSequence, Provider, ProviderDescriptor, Result,
};

pub use classes::{CLASSES, SERVICES};

pub const NAME: &str = "gcp";

pub const CONFIG: &str = include_str!("../config/gcp.toml");

const INTERMEDIARIES: &[&str] = &[
    "google_project_iam_member",
    "google_project_iam_binding",
    "google_compute_instance_group",
];

/// `(child, parent, parent-pointer field)`
const GROUPS: &[(&str, &str, &str)] = &[
    ("google_compute_subnetwork", "google_compute_network", "network"),
    ("google_container_node_pool", "google_container_cluster", "cluster"),
];

const WRAPPERS: &[&str] = &["google_compute_firewall"];

#[derive(Debug, Clone)]
pub struct GcpProvider {
    descriptor: ProviderDescriptor,
}

impl Default for GcpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GcpProvider {
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                name: NAME,
                display_name: "Google Cloud",
                prefix: "google_",
                config: ConfigSource::Embedded(CONFIG),
                class_namespace: "resource_classes.gcp",
                icon_namespace: "icons/gcp",
                capabilities: Capabilities {
                    annotations: false,
                    remote_modules: true,
                },
                aliases: &["google", "gcloud"],
            },
        }
    }

    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor.config = ConfigSource::File(path.into());
        self
    }
}

impl Provider for GcpProvider {
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
    Arc::new(GcpProvider::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tfgraph_core::{HandlerKind, ProviderContext};

    #[test]
    fn test_embedded_config_loads() {
        let cx = ProviderContext::load(GcpProvider::new().descriptor()).unwrap();
        assert_eq!(cx.provider(), NAME);
        assert_eq!(cx.draw_rank("google_compute_network"), 1);
        let rule = cx.variant_rules("google_sql_database_instance").next().unwrap();
        assert_eq!(rule.classify(Some("POSTGRES_15")), "google_sql_postgres");
        assert_eq!(rule.classify(Some("MYSQL_8_0")), "google_sql_mysql");
        assert_eq!(rule.classify(Some("SQLSERVER_2019_STANDARD")), "google_sql_sqlserver");
    }

    #[test]
    fn test_no_overlay_step() {
        let sequence = GcpProvider::new().handlers().unwrap();
        assert!(sequence.iter().all(|h| h.kind() != HandlerKind::Overlay));
        assert!(!GcpProvider::new().descriptor().capabilities.annotations);
    }

    #[test]
    fn test_variant_classes_exist() {
        let provider = GcpProvider::new();
        let cx = ProviderContext::load(provider.descriptor()).unwrap();
        for rule in &cx.config().variants {
            assert!(provider.resolve_class(&rule.default).is_some(), "{}", rule.default);
            for variant in rule.values.values() {
                assert!(provider.resolve_class(variant).is_some(), "{variant}");
            }
        }
    }
}
