use tracing::debug;

use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind, KeyFate};
use crate::handlers::scrub_reference;
use crate::resource::ResourceGraph;

/// Collapses a linking resource type into direct edges.
///
/// For every `A -> I -> B` path through a node `I` of the intermediary type a
/// direct `A -> B` edge is added, then `I` and its metadata are removed and
/// parent-pointer fields naming `I` are dropped from the remaining nodes.
#[derive(Debug, Clone)]
pub struct EliminateIntermediary {
    resource_type: String,
    name: String,
}

impl EliminateIntermediary {
    pub fn new(resource_type: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            name: format!("eliminate_{resource_type}"),
            resource_type,
        }
    }
}

impl Handler for EliminateIntermediary {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Intermediary
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let intermediaries = rg.keys_of_type(&self.resource_type);
        if intermediaries.is_empty() {
            return Ok(());
        }

        let mut linked = 0usize;
        for node in &intermediaries {
            let parents = rg.graph.parents_of(node);
            let children = rg.graph.children(node).to_vec();
            for parent in &parents {
                for child in &children {
                    // Chains of intermediaries collapse as each one is removed.
                    if parent != child && rg.graph.add_edge(parent, child) {
                        linked += 1;
                    }
                }
            }
            rg.remove_resource(node);
            cx.record_fate(node.clone(), KeyFate::Eliminated { parents, children });
        }

        let fields = cx.context.parent_fields();
        if !fields.is_empty() {
            for (_, meta) in rg.meta.iter_mut() {
                for node in &intermediaries {
                    scrub_reference(meta, fields, node);
                }
            }
        }

        debug!(
            resource_type = %self.resource_type,
            removed = intermediaries.len(),
            linked,
            "eliminated intermediaries"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{Fixture, children, graph, meta_for};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_path_through_intermediary_becomes_direct() {
        let fx = Fixture::new();
        let mut rg = graph(
            &[
                ("aws_lambda_function.lambda1", "aws_iam_policy.policy1"),
                ("aws_iam_policy.policy1", "aws_sqs_queue.queue1"),
            ],
            &[],
        );
        rg.insert_node(
            "aws_iam_role.exec",
            meta_for("aws_iam_role.exec", 1).with_attr("policy_arn", "${aws_iam_policy.policy1.arn}"),
        );

        fx.apply_twice(&EliminateIntermediary::new("aws_iam_policy"), &mut rg);

        assert_eq!(
            children(&rg, "aws_lambda_function.lambda1"),
            vec!["aws_sqs_queue.queue1"]
        );
        assert!(!rg.graph.contains("aws_iam_policy.policy1"));
        assert!(!rg.meta.contains("aws_iam_policy.policy1"));
        assert!(rg.graph.edges().all(|(p, c)| p != "aws_iam_policy.policy1"
            && c != "aws_iam_policy.policy1"));
        assert!(rg.meta.get("aws_iam_role.exec").unwrap().attr("policy_arn").is_none());
        assert!(rg.validate(fx.context.parent_fields()).is_empty());
    }

    #[test]
    fn test_fan_in_and_fan_out() {
        let fx = Fixture::new();
        let mut rg = graph(
            &[
                ("aws_lb.a", "aws_lb_target_group_attachment.att"),
                ("aws_lb.b", "aws_lb_target_group_attachment.att"),
                ("aws_lb_target_group_attachment.att", "aws_instance.x"),
                ("aws_lb_target_group_attachment.att", "aws_instance.y"),
                ("aws_lb.a", "aws_instance.x"),
            ],
            &[],
        );
        fx.apply_twice(
            &EliminateIntermediary::new("aws_lb_target_group_attachment"),
            &mut rg,
        );
        assert_eq!(children(&rg, "aws_lb.a"), vec!["aws_instance.x", "aws_instance.y"]);
        assert_eq!(children(&rg, "aws_lb.b"), vec!["aws_instance.x", "aws_instance.y"]);
        assert_eq!(rg.graph.edge_count(), 4);
    }

    #[test]
    fn test_chained_intermediaries() {
        let fx = Fixture::new();
        let mut rg = graph(
            &[
                ("aws_instance.a", "aws_volume_attachment.one"),
                ("aws_volume_attachment.one", "aws_volume_attachment.two"),
                ("aws_volume_attachment.two", "aws_ebs_volume.b"),
            ],
            &[],
        );
        fx.apply_twice(&EliminateIntermediary::new("aws_volume_attachment"), &mut rg);
        assert_eq!(children(&rg, "aws_instance.a"), vec!["aws_ebs_volume.b"]);
        assert_eq!(rg.len(), 2);
    }
}
