/// Resource type (or variant) → class under `resource_classes.azure`.
pub const CLASSES: &[(&str, &str)] = &[
    // compute
    ("azurerm_linux_virtual_machine", "compute.VM"),
    ("azurerm_windows_virtual_machine", "compute.VM"),
    ("azurerm_virtual_machine", "compute.VM"),
    ("azurerm_linux_virtual_machine_scale_set", "compute.VMScaleSet"),
    ("azurerm_windows_virtual_machine_scale_set", "compute.VMScaleSet"),
    ("azurerm_kubernetes_cluster", "compute.KubernetesServices"),
    ("azurerm_container_registry", "compute.ContainerRegistries"),
    ("azurerm_linux_function_app", "compute.FunctionApps"),
    ("azurerm_function_app", "compute.FunctionApps"),
    // network
    ("azurerm_virtual_network", "network.VirtualNetworks"),
    ("azurerm_subnet", "network.Subnets"),
    ("azurerm_network_interface", "network.NetworkInterfaces"),
    ("azurerm_public_ip", "network.PublicIpAddresses"),
    ("azurerm_nat_gateway", "network.NATGateway"),
    ("azurerm_lb_basic", "network.LoadBalancers"),
    ("azurerm_lb_standard", "network.LoadBalancers"),
    ("azurerm_lb_gateway", "network.LoadBalancerGateway"),
    ("azurerm_application_gateway", "network.ApplicationGateway"),
    ("azurerm_dns_zone", "network.DNSZones"),
    ("azurerm_cdn_profile", "network.CDNProfiles"),
    // security
    ("azurerm_network_security_group", "network.NetworkSecurityGroupsClassic"),
    ("azurerm_key_vault", "security.KeyVaults"),
    ("azurerm_user_assigned_identity", "identity.ManagedIdentities"),
    // storage
    ("azurerm_storage_v2", "storage.StorageAccounts"),
    ("azurerm_storage_blob", "storage.BlobStorage"),
    ("azurerm_storage_block_blob", "storage.BlobStorage"),
    ("azurerm_storage_file", "storage.StorageAccounts"),
    ("azurerm_managed_disk", "compute.Disks"),
    // database
    ("azurerm_mssql_server", "database.SQLServers"),
    ("azurerm_postgresql_flexible_server", "database.DatabaseForPostgresqlServers"),
    ("azurerm_cosmosdb_account", "database.CosmosDb"),
    ("azurerm_redis_cache", "database.CacheForRedis"),
    // management
    ("azurerm_resource_group", "general.Resourcegroups"),
    ("azurerm_log_analytics_workspace", "analytics.LogAnalyticsWorkspaces"),
    // synthetic nodes
    ("azurerm_internet", "general.Internet"),
    ("azurerm_users", "general.Users"),
];

/// Categories for Azure types missing from the shared table.
pub const SERVICES: &[(&str, &str)] = &[
    ("azurerm_network_interface", "network.interface"),
    ("azurerm_private_endpoint", "network.endpoint"),
    ("azurerm_route_table", "network.routing"),
    ("azurerm_app_service_plan", "compute.plan"),
    ("azurerm_service_plan", "compute.plan"),
    ("azurerm_linux_web_app", "compute.webapp"),
    ("azurerm_windows_web_app", "compute.webapp"),
    ("azurerm_eventhub", "analytics.stream"),
];
