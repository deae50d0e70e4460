use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind, KeyFate};
use crate::key::NodeKey;
use crate::meta::{NodeMeta, reference_target};
use crate::resource::ResourceGraph;

/// Merges every resource matching a consolidation rule into the rule's target.
///
/// Parents of a merged node point at the target instead, its children become
/// the target's children, and the merged node disappears together with its
/// metadata. The merged keys are listed in the target's `consolidated` attribute,
/// and parent-pointer fields naming a merged node name the target instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct Consolidate;

impl Handler for Consolidate {
    fn name(&self) -> &str {
        "consolidate"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Consolidation
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let mut groups: IndexMap<NodeKey, Vec<NodeKey>> = IndexMap::new();
        for key in rg.graph.keys() {
            let Some(rule) = cx.context.consolidation_rule(rg.resource_type(key)) else {
                continue;
            };
            if *key != rule.target {
                groups
                    .entry(rule.target.clone())
                    .or_default()
                    .push(key.clone());
            }
        }

        for (target, members) in groups {
            if !rg.meta.contains(&target) {
                let provider = members
                    .iter()
                    .find_map(|m| rg.meta.get(m).map(|meta| meta.provider.clone()))
                    .unwrap_or_else(|| cx.provider_name().to_string());
                rg.insert_node(
                    target.clone(),
                    NodeMeta::new(provider, target.resource_type(), 1),
                );
            }
            rg.graph.add_node(target.clone());

            for member in &members {
                for parent in rg.graph.parents_of(member) {
                    if parent == target || members.contains(&parent) {
                        rg.graph.remove_edge(&parent, member);
                    } else {
                        rg.graph.replace_child(&parent, member, &target);
                    }
                }
                for child in rg.graph.children(member).to_vec() {
                    if child != target && !members.contains(&child) {
                        rg.graph.add_edge(&target, &child);
                    }
                }
                rg.remove_resource(member);
                cx.record_fate(member.clone(), KeyFate::Merged(target.clone()));
            }

            if let Some(meta) = rg.meta.get_mut(&target) {
                let mut merged: Vec<Value> = meta
                    .attr("consolidated")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                merged.extend(members.iter().map(|m| Value::from(m.as_str())));
                meta.set_attr("consolidated", merged);
            }
            redirect_references(rg, cx.context.parent_fields(), &members, &target);
            debug!(target = %target, merged = members.len(), "consolidated resources");
        }
        Ok(())
    }
}

/// Rewrite references to any of `members` in `fields` so they name `target`.
/// Lists that end up naming the target twice keep the first entry.
fn redirect_references(rg: &mut ResourceGraph, fields: &[String], members: &[NodeKey], target: &NodeKey) {
    if fields.is_empty() {
        return;
    }
    let redirect = |raw: &str| -> Option<String> {
        let member = reference_target(raw)?;
        members
            .contains(&member)
            .then(|| raw.replacen(member.as_str(), target.as_str(), 1))
    };

    for (_, meta) in rg.meta.iter_mut() {
        for field in fields {
            match meta.attrs.get_mut(field.as_str()) {
                Some(Value::String(raw)) => {
                    if let Some(new) = redirect(raw) {
                        *raw = new;
                    }
                }
                Some(Value::Array(items)) => {
                    let mut changed = false;
                    for item in items.iter_mut() {
                        if let Some(new) = item.as_str().and_then(redirect) {
                            *item = Value::String(new);
                            changed = true;
                        }
                    }
                    if changed {
                        let mut seen = HashSet::new();
                        items.retain(|item| seen.insert(item.to_string()));
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{Fixture, children, graph, meta_for};
    use textwrap::dedent;

    fn fixture() -> Fixture {
        Fixture::with_config(&dedent(
            r#"
            draw_order = []
            variants = []
            auto_annotations = []

            [[consolidated]]
            prefix = "aws_route53"
            target = "aws_route53_record.route_53"
            "#,
        ))
    }

    #[test]
    fn test_family_merged_into_target() {
        let fx = fixture();
        let mut rg = graph(
            &[
                ("aws_cloudfront_distribution.cdn", "aws_route53_zone.main"),
                ("aws_route53_zone.main", "aws_route53_record.www"),
                ("aws_route53_record.www", "aws_lb.web"),
                ("aws_route53_record.api", "aws_lb.api"),
            ],
            &[],
        );

        fx.apply_twice(&Consolidate, &mut rg);

        assert!(!rg.graph.contains("aws_route53_zone.main"));
        assert!(!rg.meta.contains("aws_route53_record.www"));
        assert_eq!(
            children(&rg, "aws_cloudfront_distribution.cdn"),
            vec!["aws_route53_record.route_53"]
        );
        assert_eq!(
            children(&rg, "aws_route53_record.route_53"),
            vec!["aws_lb.web", "aws_lb.api"]
        );
        let meta = rg.meta.get("aws_route53_record.route_53").unwrap();
        assert_eq!(meta.resource_type, "aws_route53_record");
        assert_eq!(meta.attr("consolidated").unwrap().as_array().unwrap().len(), 3);
        assert!(rg.metadata_defects().is_empty());
    }

    #[test]
    fn test_parent_fields_follow_the_target() {
        let fx = Fixture::with_config(&dedent(
            r#"
            parent_fields = ["zone_id", "records"]
            draw_order = []
            variants = []
            auto_annotations = []

            [[consolidated]]
            prefix = "aws_route53"
            target = "aws_route53_record.route_53"
            "#,
        ));
        let mut rg = graph(
            &[("aws_route53_record.www", "aws_route53_zone.main")],
            &["aws_s3_bucket.logs"],
        );
        rg.insert_node(
            "aws_acm_certificate_validation.cert",
            meta_for("aws_acm_certificate_validation.cert", 1)
                .with_attr("zone_id", "${aws_route53_zone.main.zone_id}"),
        );
        rg.insert_node(
            "aws_lb.web",
            meta_for("aws_lb.web", 1).with_attr(
                "records",
                serde_json::json!(["aws_route53_zone.main.id", "aws_route53_record.www.id", "aws_s3_bucket.logs.id"]),
            ),
        );

        fx.apply_twice(&Consolidate, &mut rg);

        let cert = rg.meta.get("aws_acm_certificate_validation.cert").unwrap();
        assert_eq!(cert.attr_str("zone_id"), Some("${aws_route53_record.route_53.zone_id}"));
        let lb = rg.meta.get("aws_lb.web").unwrap();
        assert_eq!(
            lb.attr("records").unwrap(),
            &serde_json::json!(["aws_route53_record.route_53.id", "aws_s3_bucket.logs.id"])
        );
        assert!(rg.validate(fx.context.parent_fields()).is_empty());
    }

    #[test]
    fn test_no_match_is_noop() {
        let fx = fixture();
        let mut rg = graph(&[("aws_instance.a", "aws_vpc.main")], &[]);
        let before = rg.clone();
        Consolidate.apply(&mut rg, &fx.cx()).unwrap();
        assert_eq!(rg, before);
    }
}
