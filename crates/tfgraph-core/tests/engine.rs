mod common;

use common::{aws, broken_config, children, google, misordered, parse, registry};
use pretty_assertions::assert_eq;
use tfgraph_core::meta::{ATTR_DISPLAY_LABEL, ATTR_WRAPPED};
use tfgraph_core::{AnnotationOverlay, Engine, EngineOptions, ErrorKind, ResourceGraph};

const WEB_STACK: &str = r#"{
  "graph": {
    "aws_subnet.a": ["aws_vpc.main"],
    "aws_instance.web": ["aws_subnet.a", "aws_security_group.sg", "aws_iam_role.exec"],
    "aws_vpc.main": [],
    "aws_security_group.sg": [],
    "aws_iam_role.exec": ["aws_iam_role_policy_attachment.attach"],
    "aws_iam_role_policy_attachment.attach": ["aws_iam_policy.read"],
    "aws_iam_policy.read": [],
    "aws_lb.front": []
  },
  "metadata": {
    "aws_subnet.a": {"count": 1, "provider": "aws", "type": "aws_subnet", "vpc_id": "${aws_vpc.main.id}"},
    "aws_instance.web": {"count": 1, "provider": "aws", "type": "aws_instance"},
    "aws_vpc.main": {"count": 1, "provider": "aws", "type": "aws_vpc", "cidr_block": "10.0.0.0/16"},
    "aws_security_group.sg": {"count": 1, "provider": "aws", "type": "aws_security_group"},
    "aws_iam_role.exec": {"count": 1, "provider": "aws", "type": "aws_iam_role"},
    "aws_iam_role_policy_attachment.attach": {"count": 1, "provider": "aws", "type": "aws_iam_role_policy_attachment", "role": "${aws_iam_role.exec.name}"},
    "aws_iam_policy.read": {"count": 1, "provider": "aws", "type": "aws_iam_policy"},
    "aws_lb.front": {"count": 1, "provider": "aws", "type": "aws_lb", "load_balancer_type": "network"}
  }
}"#;

const MIXED: &str = r#"{
  "graph": {
    "aws_sqs_queue.jobs": [],
    "google_cloudfunctions_function.worker": ["aws_sqs_queue.jobs", "google_compute_subnetwork.private"],
    "google_compute_subnetwork.private": ["google_compute_network.core"],
    "google_compute_network.core": []
  },
  "metadata": {
    "aws_sqs_queue.jobs": {"count": 1, "provider": "aws", "type": "aws_sqs_queue"},
    "google_cloudfunctions_function.worker": {"count": 2, "provider": "gcp", "type": "google_cloudfunctions_function"},
    "google_compute_subnetwork.private": {"count": 1, "provider": "gcp", "type": "google_compute_subnetwork", "network": "${google_compute_network.core.id}"},
    "google_compute_network.core": {"count": 1, "provider": "gcp", "type": "google_compute_network"}
  }
}"#;

fn keys(rg: &ResourceGraph) -> Vec<&str> {
    rg.graph.keys().map(|k| k.as_str()).collect()
}

#[test]
fn test_single_provider_run() {
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(parse(WEB_STACK), &AnnotationOverlay::default()).unwrap();
    let rg = &output.graph;

    assert_eq!(
        keys(rg),
        vec![
            "aws_vpc.main",
            "aws_subnet.a",
            "aws_instance.web",
            "aws_security_group.sg",
            "aws_iam_role.exec",
            "aws_iam_policy.read",
            "aws_lb.front",
        ]
    );
    assert_eq!(children(rg, "aws_vpc.main"), vec!["aws_subnet.a"]);
    assert_eq!(children(rg, "aws_instance.web"), vec!["aws_subnet.a", "aws_iam_role.exec"]);
    assert_eq!(children(rg, "aws_security_group.sg"), vec!["aws_instance.web"]);
    assert_eq!(children(rg, "aws_iam_role.exec"), vec!["aws_iam_policy.read"]);
    assert!(rg.meta.get("aws_security_group.sg").unwrap().attr_bool(ATTR_WRAPPED));
    assert_eq!(rg.meta.get("aws_lb.front").unwrap().variant(), Some("aws_nlb"));

    let web = rg.meta.get("aws_instance.web").unwrap().resolution.clone().unwrap();
    assert_eq!(web.class_ref, "test.compute.EC2");
    assert_eq!(web.icon_path, "icons/test/aws_instance.png");
    let lb = rg.meta.get("aws_lb.front").unwrap().resolution.clone().unwrap();
    assert_eq!(lb.class_ref, "test.network.NLB");
    let vpc = rg.meta.get("aws_vpc.main").unwrap().resolution.clone().unwrap();
    assert_eq!(vpc.class_ref, "generic.network.Vnet");
    assert_eq!(vpc.icon_path, "generic/network/vnet.png");

    let report = &output.report;
    assert_eq!(report.primary.as_deref(), Some("aws"));
    assert_eq!(report.detection.confidence, 1.0);
    assert_eq!(report.applied["aws"].len(), 9);
    assert!(report.skipped.is_empty());
    assert!(report.is_clean(), "{:?}", report.issues_after);
}

#[test]
fn test_mixed_providers_partition_and_restore_cross_edges() {
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(parse(MIXED), &AnnotationOverlay::default()).unwrap();
    let rg = &output.graph;

    assert!(output.report.detection.is_mixed());
    assert_eq!(
        output.report.applied.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["aws", "gcp"]
    );
    assert!(!rg.graph.contains("google_cloudfunctions_function.worker"));
    for worker in [
        "google_cloudfunctions_function.worker~1",
        "google_cloudfunctions_function.worker~2",
    ] {
        assert_eq!(
            children(rg, worker),
            vec!["google_compute_subnetwork.private", "aws_sqs_queue.jobs"]
        );
    }
    assert_eq!(
        children(rg, "google_compute_network.core"),
        vec!["google_compute_subnetwork.private"]
    );
    assert!(output.report.warnings.is_empty());
    assert!(output.report.is_clean(), "{:?}", output.report.issues_after);
}

#[test]
fn test_cross_edges_follow_eliminated_and_merged_nodes() {
    let input = parse(
        r#"{
          "graph": {
            "google_cloudfunctions_function.f": ["aws_iam_role_policy_attachment.att", "aws_route53_zone.main"],
            "aws_iam_role_policy_attachment.att": ["aws_iam_policy.p"],
            "aws_iam_policy.p": [],
            "aws_route53_zone.main": [],
            "aws_route53_record.www": ["google_compute_network.core"],
            "google_compute_network.core": [],
            "aws_iam_role.r": ["aws_iam_role_policy_attachment.link"],
            "aws_iam_role_policy_attachment.link": ["google_service_account.sa"],
            "google_service_account.sa": []
          },
          "metadata": {
            "google_cloudfunctions_function.f": {"count": 1, "provider": "gcp", "type": "google_cloudfunctions_function"},
            "aws_iam_role_policy_attachment.att": {"count": 1, "provider": "aws", "type": "aws_iam_role_policy_attachment"},
            "aws_iam_policy.p": {"count": 1, "provider": "aws", "type": "aws_iam_policy"},
            "aws_route53_zone.main": {"count": 1, "provider": "aws", "type": "aws_route53_zone"},
            "aws_route53_record.www": {"count": 1, "provider": "aws", "type": "aws_route53_record"},
            "google_compute_network.core": {"count": 1, "provider": "gcp", "type": "google_compute_network"},
            "aws_iam_role.r": {"count": 1, "provider": "aws", "type": "aws_iam_role"},
            "aws_iam_role_policy_attachment.link": {"count": 1, "provider": "aws", "type": "aws_iam_role_policy_attachment"},
            "google_service_account.sa": {"count": 1, "provider": "gcp", "type": "google_service_account"}
          }
        }"#,
    );
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(input, &AnnotationOverlay::default()).unwrap();
    let rg = &output.graph;

    assert!(output.report.warnings.is_empty(), "{:?}", output.report.warnings);
    assert_eq!(
        children(rg, "google_cloudfunctions_function.f"),
        vec!["aws_iam_policy.p", "aws_route53_record.dns"]
    );
    assert_eq!(children(rg, "aws_route53_record.dns"), vec!["google_compute_network.core"]);
    assert_eq!(children(rg, "aws_iam_role.r"), vec!["google_service_account.sa"]);
    for gone in [
        "aws_iam_role_policy_attachment.att",
        "aws_iam_role_policy_attachment.link",
        "aws_route53_zone.main",
        "aws_route53_record.www",
    ] {
        assert!(!rg.graph.contains(gone), "{gone}");
    }
    assert!(output.report.is_clean(), "{:?}", output.report.issues_after);
}

#[test]
fn test_overlay_edges_between_partitions() {
    let overlay = AnnotationOverlay::default()
        .with_edge("aws_sqs_queue.jobs", "google_compute_network.core")
        .with_edge("google_compute_subnetwork.private", "google_cloudfunctions_function.worker")
        .with_edge("aws_lambda_function.*", "aws_sqs_queue.jobs");
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(parse(MIXED), &overlay).unwrap();
    let rg = &output.graph;

    assert_eq!(children(rg, "aws_sqs_queue.jobs"), vec!["google_compute_network.core"]);
    let core = rg.meta.get("google_compute_network.core").unwrap();
    assert_eq!(core.provider, "gcp");
    assert!(!core.is_synthetic());
    // gcp does not take annotations, so its own pair is left alone
    assert!(children(rg, "google_compute_subnetwork.private").is_empty());
    assert_eq!(rg.len(), 5);
    assert_eq!(
        output.report.warnings,
        vec![
            "overlay edge 'aws_lambda_function.*' -> 'aws_sqs_queue.jobs' skipped: 'aws_lambda_function.*' matches no node"
                .to_string()
        ]
    );
}

#[test]
fn test_parallel_matches_sequential() {
    let registry = registry(vec![aws(), google()]);
    let sequential = Engine::new(registry.clone())
        .run(parse(MIXED), &AnnotationOverlay::default())
        .unwrap();
    let parallel = Engine::new(registry)
        .with_options(EngineOptions::default().with_parallel(true))
        .run(parse(MIXED), &AnnotationOverlay::default())
        .unwrap();

    assert_eq!(sequential.graph, parallel.graph);
    assert_eq!(sequential.report.applied, parallel.report.applied);
    assert_ne!(sequential.report.run_id, parallel.report.run_id);
}

#[test]
fn test_forced_provider_owns_every_node() {
    let engine = Engine::new(registry(vec![aws(), google()]))
        .with_options(EngineOptions::default().with_provider(Some("aws".to_string())));
    let output = engine.run(parse(MIXED), &AnnotationOverlay::default()).unwrap();

    assert_eq!(output.report.primary.as_deref(), Some("aws"));
    assert_eq!(
        output.report.applied.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["aws"]
    );
    // gcp grouping never ran
    assert_eq!(
        children(&output.graph, "google_compute_subnetwork.private"),
        vec!["google_compute_network.core"]
    );
}

#[test]
fn test_unknown_forced_provider_is_an_error() {
    let engine = Engine::new(registry(vec![aws()]))
        .with_options(EngineOptions::default().with_provider(Some("oracle".to_string())));
    let err = engine.run(parse(MIXED), &AnnotationOverlay::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProvider);
}

#[test]
fn test_fallback_provider_when_nothing_detected() {
    let input = parse(
        r#"{
          "graph": {"random_pet.name": [], "null_resource.wait": ["random_pet.name"]},
          "metadata": {
            "random_pet.name": {"count": 1, "provider": "random", "type": "random_pet"},
            "null_resource.wait": {"count": 1, "provider": "null", "type": "null_resource"}
          }
        }"#,
    );

    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(input.clone(), &AnnotationOverlay::default()).unwrap();
    assert_eq!(output.report.primary.as_deref(), Some("aws"));
    assert_eq!(output.report.detection.primary, None);
    assert_eq!(output.report.detection.confidence, 0.0);
    let pet = output.graph.meta.get("random_pet.name").unwrap();
    assert!(pet.resolution.as_ref().unwrap().is_blank());

    let engine = Engine::new(registry(vec![google()]))
        .with_options(EngineOptions::default().with_fallback_provider("aws"));
    let err = engine.run(input, &AnnotationOverlay::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownProvider);
}

#[test]
fn test_empty_graph() {
    let engine = Engine::new(registry(vec![aws()]));
    let output = engine
        .run(ResourceGraph::new(), &AnnotationOverlay::default())
        .unwrap();
    assert!(output.graph.is_empty());
    assert_eq!(output.report.primary, None);
    assert!(output.report.is_clean());
}

#[test]
fn test_broken_provider_does_not_stop_others() {
    let input = parse(
        r#"{
          "graph": {
            "azurerm_resource_group.rg": ["azurerm_virtual_network.vnet"],
            "azurerm_virtual_network.vnet": [],
            "aws_instance.web": ["aws_security_group.sg"],
            "aws_security_group.sg": []
          },
          "metadata": {
            "azurerm_resource_group.rg": {"count": 1, "provider": "azure", "type": "azurerm_resource_group"},
            "azurerm_virtual_network.vnet": {"count": 1, "provider": "azure", "type": "azurerm_virtual_network"},
            "aws_instance.web": {"count": 1, "provider": "aws", "type": "aws_instance"},
            "aws_security_group.sg": {"count": 1, "provider": "aws", "type": "aws_security_group"}
          }
        }"#,
    );
    let engine = Engine::new(registry(vec![aws(), broken_config()]));
    let output = engine.run(input, &AnnotationOverlay::default()).unwrap();

    let failures = &output.report.failures;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, "azure");
    assert_eq!(failures[0].handler, None);
    assert_eq!(failures[0].kind, ErrorKind::ConfigInvalid.to_string());
    assert!(output.report.has_failures());
    assert!(!output.report.is_clean());

    // azure nodes pass through untouched, aws is still transformed
    assert_eq!(
        children(&output.graph, "azurerm_resource_group.rg"),
        vec!["azurerm_virtual_network.vnet"]
    );
    assert_eq!(children(&output.graph, "aws_security_group.sg"), vec!["aws_instance.web"]);
    let vnet = output.graph.meta.get("azurerm_virtual_network.vnet").unwrap();
    assert!(vnet.resolution.as_ref().unwrap().is_blank());
}

#[test]
fn test_invalid_handler_declaration_is_reported() {
    let input = parse(
        r#"{
          "graph": {"oci_core_instance.vm": []},
          "metadata": {"oci_core_instance.vm": {"count": 3, "provider": "oci", "type": "oci_core_instance"}}
        }"#,
    );
    let engine = Engine::new(registry(vec![aws(), misordered()]));
    let output = engine.run(input, &AnnotationOverlay::default()).unwrap();

    assert_eq!(output.report.failures.len(), 1);
    assert_eq!(output.report.failures[0].kind, ErrorKind::ConfigInvalid.to_string());
    // not expanded
    assert!(output.graph.graph.contains("oci_core_instance.vm"));
}

#[test]
fn test_missing_parent_skips_and_strict_mode_fails() {
    let input = parse(
        r#"{
          "graph": {"aws_subnet.orphan": [], "aws_instance.web": ["aws_subnet.orphan"]},
          "metadata": {
            "aws_subnet.orphan": {"count": 1, "provider": "aws", "type": "aws_subnet", "vpc_id": "${aws_vpc.gone.id}"},
            "aws_instance.web": {"count": 1, "provider": "aws", "type": "aws_instance"}
          }
        }"#,
    );
    let registry = registry(vec![aws()]);

    let output = Engine::new(registry.clone())
        .run(input.clone(), &AnnotationOverlay::default())
        .unwrap();
    assert_eq!(output.report.skipped.len(), 1);
    assert_eq!(output.report.skipped[0].handler, "group_aws_subnet_under_aws_vpc");
    assert_eq!(output.report.issues_before.len(), 1);
    assert_eq!(output.report.issues_after.len(), 1);
    assert!(!output.report.has_failures());

    let err = Engine::new(registry)
        .with_options(EngineOptions::default().with_strict(true))
        .run(input, &AnnotationOverlay::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
}

#[test]
fn test_overlay_respects_provider_capability() {
    let overlay = AnnotationOverlay::default()
        .with_label("google_compute_network.core", "Core network")
        .with_label("aws_sqs_queue.jobs", "Job queue");
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(parse(MIXED), &overlay).unwrap();

    let queue = output.graph.meta.get("aws_sqs_queue.jobs").unwrap();
    assert_eq!(queue.attr_str(ATTR_DISPLAY_LABEL), Some("Job queue"));
    let network = output.graph.meta.get("google_compute_network.core").unwrap();
    assert_eq!(network.attr_str(ATTR_DISPLAY_LABEL), None);
}

#[test]
fn test_nodes_left_unresolved_on_request() {
    let engine = Engine::new(registry(vec![aws()]))
        .with_options(EngineOptions::default().with_resolve_nodes(false));
    let output = engine.run(parse(WEB_STACK), &AnnotationOverlay::default()).unwrap();
    assert!(output.graph.meta.iter().all(|(_, m)| m.resolution.is_none()));
}

#[test]
fn test_report_serializes() {
    let engine = Engine::new(registry(vec![aws(), google()]));
    let output = engine.run(parse(MIXED), &AnnotationOverlay::default()).unwrap();
    let json = serde_json::to_value(&output.report).unwrap();
    assert_eq!(json["primary"], "gcp");
    assert_eq!(json["detection"]["counts"]["aws"], 1);
    assert_eq!(json["detection"]["counts"]["gcp"], 3);
}
