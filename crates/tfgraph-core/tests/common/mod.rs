use std::sync::Arc;

use tfgraph_core::handlers::{
    ApplyDrawOrder, ApplyOverlay, Consolidate, DetectVariants, EliminateIntermediary,
    ExpandInstances, Group, Reverse,
};
use tfgraph_core::{
    Capabilities, ConfigSource, Handler, HandlerSequence, Provider, ProviderDescriptor,
    ProviderRegistry, ResourceGraph, Result,
};
use tracing_subscriber::EnvFilter;

pub const CLOUD_A_CONFIG: &str = r#"
parent_fields = ["vpc_id", "role"]
draw_order = [["aws_vpc"], ["aws_subnet"]]
auto_annotations = []

[[consolidated]]
prefix = "aws_route53"
target = "aws_route53_record.dns"

[[variants]]
resource = "aws_lb"
field = "load_balancer_type"
default = "aws_alb"
values = { network = "aws_nlb", application = "aws_alb" }
"#;

pub const CLOUD_B_CONFIG: &str = r#"
parent_fields = ["network"]
consolidated = []
draw_order = []
variants = []
auto_annotations = []
"#;

pub struct TestProvider {
    descriptor: ProviderDescriptor,
    build: fn() -> Vec<Box<dyn Handler>>,
}

impl Provider for TestProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn handlers(&self) -> Result<HandlerSequence> {
        HandlerSequence::new((self.build)())
    }

    fn class_table(&self) -> &'static [(&'static str, &'static str)] {
        &[("aws_instance", "compute.EC2"), ("aws_nlb", "network.NLB")]
    }
}

fn descriptor(
    name: &'static str,
    prefix: &'static str,
    config: ConfigSource,
    annotations: bool,
) -> ProviderDescriptor {
    ProviderDescriptor {
        name,
        display_name: name,
        prefix,
        config,
        class_namespace: "test",
        icon_namespace: "icons/test",
        capabilities: Capabilities {
            annotations,
            remote_modules: false,
        },
        aliases: &[],
    }
}

fn aws_handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(Consolidate),
        Box::new(ExpandInstances),
        Box::new(EliminateIntermediary::new("aws_iam_role_policy_attachment")),
        Box::new(Group::new("aws_subnet", "aws_vpc").via("vpc_id")),
        Box::new(Group::new("aws_vpc_endpoint", "aws_vpc").via("vpc_id")),
        Box::new(Reverse::new("aws_security_group")),
        Box::new(DetectVariants),
        Box::new(ApplyOverlay),
        Box::new(ApplyDrawOrder),
    ]
}

fn google_handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(ExpandInstances),
        Box::new(Group::new("google_compute_subnetwork", "google_compute_network").via("network")),
        Box::new(ApplyOverlay),
    ]
}

/// Declares an intermediary pass before expansion, which sequences reject.
fn misordered_handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(EliminateIntermediary::new("oci_attachment")),
        Box::new(ExpandInstances),
    ]
}

pub fn aws() -> Arc<dyn Provider> {
    Arc::new(TestProvider {
        descriptor: descriptor("aws", "aws_", ConfigSource::Embedded(CLOUD_A_CONFIG), true),
        build: aws_handlers,
    })
}

pub fn google() -> Arc<dyn Provider> {
    Arc::new(TestProvider {
        descriptor: descriptor("gcp", "google_", ConfigSource::Embedded(CLOUD_B_CONFIG), false),
        build: google_handlers,
    })
}

/// A provider whose configuration does not parse.
pub fn broken_config() -> Arc<dyn Provider> {
    Arc::new(TestProvider {
        descriptor: descriptor("azure", "azurerm_", ConfigSource::Embedded("draw_order = 3"), true),
        build: aws_handlers,
    })
}

pub fn misordered() -> Arc<dyn Provider> {
    Arc::new(TestProvider {
        descriptor: descriptor("oci", "oci_", ConfigSource::Embedded(CLOUD_B_CONFIG), true),
        build: misordered_handlers,
    })
}

#[allow(dead_code)]
pub fn registry(providers: Vec<Arc<dyn Provider>>) -> Arc<ProviderRegistry> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider).unwrap();
    }
    Arc::new(registry)
}

#[allow(dead_code)]
pub fn parse(json: &str) -> ResourceGraph {
    serde_json::from_str(json).unwrap()
}

#[allow(dead_code)]
pub fn children<'a>(rg: &'a ResourceGraph, key: &str) -> Vec<&'a str> {
    rg.graph.children(key).iter().map(|k| k.as_str()).collect()
}
