mod common;

use std::collections::HashSet;

use common::{CLOUD_A_CONFIG, aws, registry};
use proptest::prelude::*;
use tfgraph_core::handlers::{
    ApplyDrawOrder, DetectVariants, EliminateIntermediary, ExpandInstances, Group, Reverse,
};
use tfgraph_core::{
    AnnotationOverlay, Engine, Handler, HandlerCtxt, NodeKey, NodeMeta, ProviderContext,
    ResourceGraph, ServiceMapping,
};

const TYPES: &[&str] = &[
    "aws_vpc",
    "aws_subnet",
    "aws_instance",
    "aws_security_group",
    "aws_iam_role_policy_attachment",
    "aws_iam_role",
    "aws_lb",
];

/// Nodes are `(type index, count)`. `edges` point from the lower to the higher
/// node index and `back_edges` the other way, so any back edge closes a cycle.
fn build(
    nodes: Vec<(usize, u32)>,
    edges: Vec<(usize, usize)>,
    back_edges: Vec<(usize, usize)>,
) -> ResourceGraph {
    let mut rg = ResourceGraph::new();
    let keys: Vec<NodeKey> = nodes
        .iter()
        .enumerate()
        .map(|(i, (ty, _))| NodeKey::from_parts(TYPES[*ty], &format!("n{i}")))
        .collect();
    let first_vpc = keys.iter().find(|k| k.resource_type() == "aws_vpc").cloned();

    for (key, (_, count)) in keys.iter().zip(&nodes) {
        let mut meta = NodeMeta::new("aws", key.resource_type(), *count);
        if key.resource_type() == "aws_subnet"
            && let Some(vpc) = &first_vpc
        {
            meta.set_attr("vpc_id", format!("${{{vpc}.id}}"));
        }
        if key.resource_type() == "aws_lb" {
            meta.set_attr("load_balancer_type", "network");
        }
        rg.insert_node(key.clone(), meta);
    }
    let ordered = |(a, b): (usize, usize)| {
        let (a, b) = (a % keys.len(), b % keys.len());
        (a.min(b), a.max(b))
    };
    for (low, high) in edges.into_iter().map(ordered) {
        if low != high {
            rg.graph.add_edge(&keys[low], &keys[high]);
        }
    }
    for (low, high) in back_edges.into_iter().map(ordered) {
        if low != high {
            rg.graph.add_edge(&keys[high], &keys[low]);
        }
    }
    rg
}

fn arb_graph() -> impl Strategy<Value = ResourceGraph> {
    (
        prop::collection::vec((0..TYPES.len(), 1u32..=3), 1..10),
        prop::collection::vec((0usize..10, 0usize..10), 0..20),
        prop::collection::vec((0usize..10, 0usize..10), 0..6),
    )
        .prop_map(|(nodes, edges, back_edges)| build(nodes, edges, back_edges))
}

fn handlers() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(ExpandInstances),
        Box::new(EliminateIntermediary::new("aws_iam_role_policy_attachment")),
        Box::new(Group::new("aws_subnet", "aws_vpc").via("vpc_id")),
        Box::new(Reverse::new("aws_security_group")),
        Box::new(DetectVariants),
        Box::new(ApplyDrawOrder),
    ]
}

fn assert_well_formed(rg: &ResourceGraph) {
    for (key, children) in rg.graph.iter() {
        let unique: HashSet<&NodeKey> = children.iter().collect();
        assert_eq!(unique.len(), children.len(), "duplicate edge under '{key}'");
        for child in children {
            assert!(rg.graph.contains(child), "'{child}' is not a node");
        }
    }
}

#[test]
fn cycles_through_every_handler_stay_well_formed() {
    let rg = build(
        vec![(0, 1), (1, 2), (4, 1), (3, 1), (2, 2)],
        vec![(0, 1), (1, 2), (2, 3), (3, 4)],
        vec![(4, 0), (3, 1), (2, 0)],
    );
    assert!(rg.graph.children("aws_iam_role_policy_attachment.n2").contains(&NodeKey::from("aws_vpc.n0")));

    let engine = Engine::new(registry(vec![aws()]));
    let output = engine.run(rg, &AnnotationOverlay::default()).unwrap();
    assert!(output.report.failures.is_empty(), "{:?}", output.report.failures);
    assert!(!output.graph.graph.contains("aws_iam_role_policy_attachment.n2"));
    assert!(output.graph.metadata_defects().is_empty());
    assert_well_formed(&output.graph);
}

proptest! {
    #[test]
    fn handlers_are_idempotent(mut rg in arb_graph()) {
        let provider = aws();
        let context = ProviderContext::from_toml("aws", CLOUD_A_CONFIG).unwrap();
        let overlay = AnnotationOverlay::default();
        let services = ServiceMapping::builtin();
        let cx = HandlerCtxt::new(provider.as_ref(), &context, &overlay, &services);

        for handler in handlers() {
            let result = handler.apply(&mut rg, &cx);
            if result.is_err() {
                continue;
            }
            let once = rg.clone();
            handler.apply(&mut rg, &cx).unwrap();
            prop_assert_eq!(&once, &rg, "{} is not idempotent", handler.name());
            assert_well_formed(&rg);
        }
    }

    #[test]
    fn engine_runs_are_deterministic_and_consistent(rg in arb_graph()) {
        let engine = Engine::new(registry(vec![aws()]));
        let first = engine.run(rg.clone(), &AnnotationOverlay::default()).unwrap();
        let second = engine.run(rg, &AnnotationOverlay::default()).unwrap();

        prop_assert_eq!(&first.graph, &second.graph);
        prop_assert!(first.report.failures.is_empty(), "{:?}", first.report.failures);
        prop_assert!(first.graph.metadata_defects().is_empty());
        assert_well_formed(&first.graph);
    }
}
