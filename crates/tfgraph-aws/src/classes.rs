/// Resource type (or variant) → class under `resource_classes.aws`.
pub const CLASSES: &[(&str, &str)] = &[
    // compute
    ("aws_instance", "compute.EC2"),
    ("aws_autoscaling_group", "compute.EC2AutoScaling"),
    ("aws_lambda_function", "compute.Lambda"),
    ("aws_ecs_cluster", "compute.ElasticContainerService"),
    ("aws_ecs_service_ec2", "compute.ElasticContainerServiceService"),
    ("aws_ecs_service_fargate", "compute.Fargate"),
    ("aws_eks_cluster", "compute.ElasticKubernetesService"),
    ("aws_eks_node_group", "compute.EKSNodeGroup"),
    ("aws_ecr_repository", "compute.ElasticContainerRegistry"),
    // network
    ("aws_vpc", "network.VPC"),
    ("aws_subnet", "network.PublicSubnet"),
    ("aws_vpc_endpoint", "network.Endpoint"),
    ("aws_internet_gateway", "network.InternetGateway"),
    ("aws_nat_gateway", "network.NATGateway"),
    ("aws_route_table", "network.RouteTable"),
    ("aws_eip", "network.ElasticIp"),
    ("aws_alb", "network.ElasticLoadBalancerApplicationLoadBalancer"),
    ("aws_nlb", "network.ElasticLoadBalancerNetworkLoadBalancer"),
    ("aws_gwlb", "network.ElasticLoadBalancerGatewayLoadBalancer"),
    ("aws_elb", "network.ElasticLoadBalancing"),
    ("aws_route53_record", "network.Route53"),
    ("aws_cloudfront_distribution", "network.CloudFront"),
    ("aws_api_gateway_rest_api", "network.APIGateway"),
    // security
    ("aws_security_group", "security.SecurityGroup"),
    ("aws_iam_role", "security.IAMRole"),
    ("aws_iam_policy", "security.IAMPermissions"),
    ("aws_kms_key", "security.KeyManagementService"),
    ("aws_acm_certificate", "security.CertificateManager"),
    ("aws_secretsmanager_secret", "security.SecretsManager"),
    // storage
    ("aws_s3_bucket", "storage.SimpleStorageServiceS3Bucket"),
    ("aws_efs_file_system", "storage.ElasticFileSystemEFS"),
    ("aws_efs_mount_target", "storage.EFSMountTarget"),
    ("aws_ebs_volume", "storage.ElasticBlockStoreEBSVolume"),
    // database
    ("aws_rds", "database.RDS"),
    ("aws_rds_aurora", "database.Aurora"),
    ("aws_rds_mariadb", "database.RDSMariadbInstance"),
    ("aws_rds_mysql", "database.RDSMysqlInstance"),
    ("aws_rds_oracle", "database.RDSOracleInstance"),
    ("aws_rds_postgres", "database.RDSPostgresqlInstance"),
    ("aws_rds_sqlserver", "database.RDSSqlServerInstance"),
    ("aws_dynamodb_table", "database.DynamodbTable"),
    ("aws_elasticache_cluster", "database.ElastiCache"),
    // integration
    ("aws_sqs_queue", "integration.SimpleQueueServiceSqsQueue"),
    ("aws_sns_topic", "integration.SimpleNotificationServiceSnsTopic"),
    // management
    ("aws_cloudwatch_log_group", "management.Cloudwatch"),
    // synthetic nodes
    ("aws_internet", "general.Internet"),
    ("aws_users", "general.Users"),
];

/// Categories for AWS types missing from the shared table.
pub const SERVICES: &[(&str, &str)] = &[
    ("aws_vpc_endpoint", "network.endpoint"),
    ("aws_route_table", "network.routing"),
    ("aws_lb_target_group", "network.loadbalancer"),
    ("aws_efs_mount_target", "storage.file"),
    ("aws_iam_policy", "security.identity"),
    ("aws_acm_certificate", "security.certificate"),
    ("aws_sfn_state_machine", "integration.workflow"),
    ("aws_kinesis_stream", "analytics.stream"),
    ("aws_glue_job", "analytics.etl"),
];
