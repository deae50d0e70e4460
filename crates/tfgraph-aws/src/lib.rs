//! Amazon Web Services provider.
//!
//! Handler order:
//!
//! 1. consolidate Route 53, CloudWatch, ACM and API Gateway families
//! 2. expand counted resources
//! 3. eliminate attachment and association resources
//! 4. group subnets and endpoints under VPCs, mount targets under file systems,
//!    services and node groups under their clusters
//! 5. reverse security groups so they contain what they protect
//! 6. load balancer, ECS launch type and RDS engine variants
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

pub const NAME: &str = "aws";

/// The configuration compiled into the provider.
pub const CONFIG: &str = include_str!("../config/aws.toml");

const INTERMEDIARIES: &[&str] = &[
    "aws_iam_instance_profile",
    "aws_iam_role_policy_attachment",
    "aws_iam_policy_attachment",
    "aws_security_group_rule",
    "aws_lb_target_group_attachment",
    "aws_route_table_association",
    "aws_volume_attachment",
];

/// `(child, parent, parent-pointer field)`
const GROUPS: &[(&str, &str, &str)] = &[
    ("aws_subnet", "aws_vpc", "vpc_id"),
    ("aws_vpc_endpoint", "aws_vpc", "vpc_id"),
    ("aws_efs_mount_target", "aws_efs_file_system", "file_system_id"),
    ("aws_ecs_service", "aws_ecs_cluster", "cluster"),
    ("aws_eks_node_group", "aws_eks_cluster", "cluster_name"),
];

const WRAPPERS: &[&str] = &["aws_security_group"];

#[derive(Debug, Clone)]
pub struct AwsProvider {
    descriptor: ProviderDescriptor,
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsProvider {
    pub fn new() -> Self {
        Self {
            descriptor: ProviderDescriptor {
                name: NAME,
                display_name: "Amazon Web Services",
                prefix: "aws_",
                config: ConfigSource::Embedded(CONFIG),
                class_namespace: "resource_classes.aws",
                icon_namespace: "icons/aws",
                capabilities: Capabilities {
                    annotations: true,
                    remote_modules: true,
                },
                aliases: &["amazon", "amazon-web-services"],
            },
        }
    }

    /// Read the configuration from `path` instead of the embedded copy.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor.config = ConfigSource::File(path.into());
        self
    }
}

impl Provider for AwsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn handlers(&self) -> Result<HandlerSequence> {
        let mut handlers: Vec<Box<dyn Handler>> = vec![Box::new(Consolidate), Box::new(ExpandInstances)];
        handlers.extend(
            INTERMEDIARIES
                .iter()
                .map(|ty| Box::new(EliminateIntermediary::new(*ty)) as Box<dyn Handler>),
        );
        handlers.extend(GROUPS.iter().map(|(child, parent, field)| {
            Box::new(Group::new(*child, *parent).via(*field)) as Box<dyn Handler>
        }));
        handlers.extend(
            WRAPPERS
                .iter()
                .map(|ty| Box::new(Reverse::new(*ty)) as Box<dyn Handler>),
        );
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
    Arc::new(AwsProvider::new())
}
