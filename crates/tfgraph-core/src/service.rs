//! Canonical cross-provider service categories.
//!
//! A [`ServiceCategory`] is a `domain.subdomain` tag shared by every provider,
//! so `aws_instance`, `azurerm_linux_virtual_machine` and
//! `google_compute_instance` all land on `compute.vm`. The node factory uses the
//! category as its fallback when a provider has no class for a type.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tfgraph_error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceCategory {
    domain: Cow<'static, str>,
    subdomain: Cow<'static, str>,
}

impl ServiceCategory {
    /// Sentinel for unmapped resource types.
    pub const GENERIC: ServiceCategory = ServiceCategory {
        domain: Cow::Borrowed("generic"),
        subdomain: Cow::Borrowed("generic"),
    };

    pub const fn new_static(domain: &'static str, subdomain: &'static str) -> Self {
        Self {
            domain: Cow::Borrowed(domain),
            subdomain: Cow::Borrowed(subdomain),
        }
    }

    pub fn new(domain: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            domain: Cow::Owned(domain.into()),
            subdomain: Cow::Owned(subdomain.into()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn is_generic(&self) -> bool {
        *self == Self::GENERIC
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.subdomain)
    }
}

impl FromStr for ServiceCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((domain, subdomain))
                if !domain.is_empty() && !subdomain.is_empty() && !subdomain.contains('.') =>
            {
                Ok(Self::new(domain, subdomain))
            }
            _ => Err(Error::invalid_argument(format!(
                "service category '{s}' is not of the form 'domain.subdomain'"
            ))),
        }
    }
}

static GENERIC: ServiceCategory = ServiceCategory::GENERIC;

/// Resource types shared by the built-in providers.
const BUILTIN: &[(&str, &str)] = &[
    // compute
    ("aws_instance", "compute.vm"),
    ("azurerm_linux_virtual_machine", "compute.vm"),
    ("azurerm_windows_virtual_machine", "compute.vm"),
    ("azurerm_virtual_machine", "compute.vm"),
    ("google_compute_instance", "compute.vm"),
    ("aws_autoscaling_group", "compute.scaling"),
    ("azurerm_linux_virtual_machine_scale_set", "compute.scaling"),
    ("azurerm_windows_virtual_machine_scale_set", "compute.scaling"),
    ("google_compute_instance_group_manager", "compute.scaling"),
    ("aws_lambda_function", "compute.function"),
    ("azurerm_function_app", "compute.function"),
    ("azurerm_linux_function_app", "compute.function"),
    ("google_cloudfunctions_function", "compute.function"),
    ("google_cloudfunctions2_function", "compute.function"),
    // containers
    ("aws_ecs_cluster", "container.cluster"),
    ("aws_eks_cluster", "container.cluster"),
    ("azurerm_kubernetes_cluster", "container.cluster"),
    ("google_container_cluster", "container.cluster"),
    ("aws_ecs_service", "container.service"),
    ("aws_eks_node_group", "container.nodepool"),
    ("azurerm_kubernetes_cluster_node_pool", "container.nodepool"),
    ("google_container_node_pool", "container.nodepool"),
    ("aws_ecr_repository", "container.registry"),
    ("azurerm_container_registry", "container.registry"),
    ("google_artifact_registry_repository", "container.registry"),
    // network
    ("aws_vpc", "network.vnet"),
    ("azurerm_virtual_network", "network.vnet"),
    ("google_compute_network", "network.vnet"),
    ("aws_subnet", "network.subnet"),
    ("azurerm_subnet", "network.subnet"),
    ("google_compute_subnetwork", "network.subnet"),
    ("aws_lb", "network.loadbalancer"),
    ("aws_elb", "network.loadbalancer"),
    ("azurerm_lb", "network.loadbalancer"),
    ("azurerm_application_gateway", "network.loadbalancer"),
    ("google_compute_forwarding_rule", "network.loadbalancer"),
    ("aws_nat_gateway", "network.nat"),
    ("azurerm_nat_gateway", "network.nat"),
    ("google_compute_router_nat", "network.nat"),
    ("aws_eip", "network.publicip"),
    ("azurerm_public_ip", "network.publicip"),
    ("google_compute_address", "network.publicip"),
    ("aws_route53_zone", "network.dns"),
    ("aws_route53_record", "network.dns"),
    ("azurerm_dns_zone", "network.dns"),
    ("google_dns_managed_zone", "network.dns"),
    ("aws_cloudfront_distribution", "network.cdn"),
    ("azurerm_cdn_profile", "network.cdn"),
    ("aws_internet_gateway", "network.gateway"),
    ("azurerm_virtual_network_gateway", "network.gateway"),
    ("google_compute_router", "network.gateway"),
    // security
    ("aws_security_group", "security.firewall"),
    ("azurerm_network_security_group", "security.firewall"),
    ("google_compute_firewall", "security.firewall"),
    ("aws_iam_role", "security.identity"),
    ("azurerm_user_assigned_identity", "security.identity"),
    ("google_service_account", "security.identity"),
    ("aws_kms_key", "security.kms"),
    ("azurerm_key_vault", "security.kms"),
    ("google_kms_crypto_key", "security.kms"),
    ("aws_secretsmanager_secret", "security.secrets"),
    ("azurerm_key_vault_secret", "security.secrets"),
    ("google_secret_manager_secret", "security.secrets"),
    // storage
    ("aws_s3_bucket", "storage.object"),
    ("azurerm_storage_account", "storage.object"),
    ("azurerm_storage_container", "storage.object"),
    ("google_storage_bucket", "storage.object"),
    ("aws_efs_file_system", "storage.file"),
    ("azurerm_storage_share", "storage.file"),
    ("google_filestore_instance", "storage.file"),
    ("aws_ebs_volume", "storage.block"),
    ("azurerm_managed_disk", "storage.block"),
    ("google_compute_disk", "storage.block"),
    // database
    ("aws_db_instance", "database.relational"),
    ("aws_rds_cluster", "database.relational"),
    ("azurerm_mssql_server", "database.relational"),
    ("azurerm_postgresql_flexible_server", "database.relational"),
    ("azurerm_mysql_flexible_server", "database.relational"),
    ("google_sql_database_instance", "database.relational"),
    ("aws_dynamodb_table", "database.nosql"),
    ("azurerm_cosmosdb_account", "database.nosql"),
    ("google_firestore_database", "database.nosql"),
    ("google_bigtable_instance", "database.nosql"),
    ("aws_elasticache_cluster", "database.cache"),
    ("azurerm_redis_cache", "database.cache"),
    ("google_redis_instance", "database.cache"),
    // integration
    ("aws_sqs_queue", "integration.queue"),
    ("azurerm_servicebus_queue", "integration.queue"),
    ("google_pubsub_subscription", "integration.queue"),
    ("aws_sns_topic", "integration.topic"),
    ("azurerm_servicebus_topic", "integration.topic"),
    ("google_pubsub_topic", "integration.topic"),
    ("aws_api_gateway_rest_api", "integration.api"),
    ("aws_apigatewayv2_api", "integration.api"),
    ("azurerm_api_management", "integration.api"),
    ("google_api_gateway_api", "integration.api"),
    // management
    ("aws_cloudwatch_log_group", "management.logging"),
    ("azurerm_log_analytics_workspace", "management.logging"),
    ("google_logging_project_sink", "management.logging"),
    ("azurerm_resource_group", "management.group"),
    ("google_project", "management.group"),
];

/// Resource type → service category lookup with a cached reverse index.
#[derive(Debug, Default)]
pub struct ServiceMapping {
    forward: HashMap<String, ServiceCategory>,
    reverse: OnceLock<HashMap<ServiceCategory, Vec<String>>>,
}

impl Clone for ServiceMapping {
    fn clone(&self) -> Self {
        Self {
            forward: self.forward.clone(),
            reverse: OnceLock::new(),
        }
    }
}

impl ServiceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapping preloaded with the cross-provider table.
    pub fn builtin() -> Self {
        let mut mapping = Self::new();
        mapping.extend_static(BUILTIN);
        mapping
    }

    /// Register `(resource_type, "domain.subdomain")` pairs. Malformed
    /// categories fall back to the generic sentinel.
    pub fn extend_static(&mut self, entries: &[(&'static str, &'static str)]) {
        for (resource_type, category) in entries {
            let category = match category.split_once('.') {
                Some((domain, subdomain)) => ServiceCategory::new_static(domain, subdomain),
                None => ServiceCategory::GENERIC,
            };
            self.forward.insert((*resource_type).to_string(), category);
        }
        self.reverse = OnceLock::new();
    }

    /// Late registration; the last write for a type wins.
    pub fn register(&mut self, resource_type: impl Into<String>, category: ServiceCategory) {
        self.forward.insert(resource_type.into(), category);
        self.reverse = OnceLock::new();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Category of `resource_type`, or [`ServiceCategory::GENERIC`]. Never fails.
    pub fn category(&self, resource_type: &str) -> &ServiceCategory {
        self.forward
            .get(resource_type)
            .unwrap_or(&GENERIC)
    }

    /// Every registered resource type in `category`, sorted.
    pub fn resources_in(&self, category: &ServiceCategory) -> &[String] {
        self.reverse_index()
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Other resource types sharing the category of `resource_type`.
    pub fn equivalents(&self, resource_type: &str) -> Vec<&str> {
        let category = self.category(resource_type);
        if category.is_generic() {
            return Vec::new();
        }
        self.resources_in(category)
            .iter()
            .map(String::as_str)
            .filter(|ty| *ty != resource_type)
            .collect()
    }

    fn reverse_index(&self) -> &HashMap<ServiceCategory, Vec<String>> {
        self.reverse.get_or_init(|| {
            let mut reverse: HashMap<ServiceCategory, Vec<String>> = HashMap::new();
            for (resource_type, category) in &self.forward {
                reverse
                    .entry(category.clone())
                    .or_default()
                    .push(resource_type.clone());
            }
            for types in reverse.values_mut() {
                types.sort();
            }
            reverse
        })
    }
}
