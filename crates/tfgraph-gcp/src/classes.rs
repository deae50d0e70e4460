/// Resource type (or variant) → class under `resource_classes.gcp`.
pub const CLASSES: &[(&str, &str)] = &[
    // compute
    ("google_compute_instance", "compute.ComputeEngine"),
    ("google_compute_instance_template", "compute.ComputeEngine"),
    ("google_compute_instance_group_manager", "compute.InstanceGroups"),
    ("google_cloudfunctions_function", "compute.Functions"),
    ("google_cloudfunctions2_function", "compute.Functions"),
    ("google_cloud_run_service", "compute.Run"),
    ("google_cloud_run_v2_service", "compute.Run"),
    ("google_container_cluster", "compute.KubernetesEngine"),
    ("google_container_node_pool", "compute.KubernetesEngineNodePool"),
    ("google_artifact_registry_repository", "devtools.ArtifactRegistry"),
    // network
    ("google_compute_network", "network.VirtualPrivateCloud"),
    ("google_compute_subnetwork", "network.Subnetwork"),
    ("google_compute_router", "network.Router"),
    ("google_compute_router_nat", "network.NAT"),
    ("google_compute_address", "network.ExternalIpAddresses"),
    ("google_compute_global_address", "network.ExternalIpAddresses"),
    ("google_compute_backend_service", "network.LoadBalancing"),
    ("google_compute_global_forwarding_rule", "network.LoadBalancing"),
    ("google_lb_external", "network.LoadBalancing"),
    ("google_lb_internal", "network.InternalLoadBalancing"),
    ("google_dns_managed_zone", "network.DNS"),
    ("google_compute_firewall", "network.FirewallRules"),
    // security
    ("google_service_account", "security.Iam"),
    ("google_kms_crypto_key", "security.KeyManagementService"),
    ("google_secret_manager_secret", "security.SecretManager"),
    // storage
    ("google_storage_bucket", "storage.Storage"),
    ("google_filestore_instance", "storage.Filestore"),
    ("google_compute_disk", "storage.PersistentDisk"),
    // database
    ("google_sql_mysql", "database.SQL"),
    ("google_sql_postgres", "database.SQL"),
    ("google_sql_sqlserver", "database.SQL"),
    ("google_firestore_database", "database.Firestore"),
    ("google_bigtable_instance", "database.Bigtable"),
    ("google_redis_instance", "database.Memorystore"),
    // analytics and integration
    ("google_bigquery_dataset", "analytics.Bigquery"),
    ("google_pubsub_topic", "analytics.PubSub"),
    ("google_logging_project_sink", "operations.Logging"),
    // management
    ("google_project", "general.Project"),
    // synthetic nodes
    ("google_internet", "general.Internet"),
    ("google_users", "general.Users"),
];

/// Categories for Google Cloud types missing from the shared table.
pub const SERVICES: &[(&str, &str)] = &[
    ("google_compute_backend_service", "network.loadbalancer"),
    ("google_compute_global_forwarding_rule", "network.loadbalancer"),
    ("google_compute_global_address", "network.publicip"),
    ("google_compute_instance_template", "compute.template"),
    ("google_cloud_run_v2_service", "compute.container"),
    ("google_cloud_scheduler_job", "integration.scheduler"),
    ("google_logging_project_sink", "management.logging"),
    ("google_project", "management.project"),
];
