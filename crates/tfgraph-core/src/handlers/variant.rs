use serde_json::Value;
use tracing::debug;

use tfgraph_error::Result;

use crate::context::VariantRule;
use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::meta::{ATTR_VARIANT, NodeMeta};
use crate::resource::ResourceGraph;

/// Records a display variant on nodes covered by the provider's variant rules.
///
/// Only metadata changes. When several rules cover a type, the first rule
/// whose field is present decides; a node without any of the fields gets the
/// first rule's default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectVariants;

const NAME: &str = "detect_variants";

fn field_text(meta: &NodeMeta, field: &str) -> Option<String> {
    match meta.attr(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        other => Some(other.to_string()),
    }
}

fn pick<'r>(rules: &[&'r VariantRule], meta: &NodeMeta) -> Option<&'r str> {
    for rule in rules {
        if let Some(value) = field_text(meta, &rule.field) {
            return Some(rule.classify(Some(&value)));
        }
    }
    rules.first().map(|rule| rule.classify(None))
}

impl Handler for DetectVariants {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::VariantDetection
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let mut resource_types: Vec<&str> = cx
            .context
            .config()
            .variants
            .iter()
            .map(|rule| rule.resource.as_str())
            .collect();
        resource_types.sort_unstable();
        resource_types.dedup();

        let mut recorded = 0usize;
        for resource_type in resource_types {
            let rules: Vec<&VariantRule> = cx.context.variant_rules(resource_type).collect();
            for key in rg.keys_of_type(resource_type) {
                let Some(meta) = rg.meta.get_mut(&key) else {
                    cx.warn(NAME, format!("'{key}' has no metadata; variant not recorded"));
                    continue;
                };
                let Some(variant) = pick(&rules, meta) else {
                    continue;
                };
                if meta.variant() != Some(variant) {
                    meta.set_attr(ATTR_VARIANT, variant);
                    recorded += 1;
                }
            }
        }
        debug!(recorded, "detected variants");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{Fixture, graph, meta_for};
    use pretty_assertions::assert_eq;
    use textwrap::dedent;

    fn fixture() -> Fixture {
        Fixture::with_config(&dedent(
            r#"
            consolidated = []
            draw_order = []
            auto_annotations = []

            [[variants]]
            resource = "aws_lb"
            field = "load_balancer_type"
            default = "aws_alb"
            values = { network = "aws_nlb", gateway = "aws_gwlb" }

            [[variants]]
            resource = "aws_db_instance"
            field = "engine"
            default = "aws_rds"
            values = { postgres = "aws_rds_postgres", aurora = "aws_aurora" }
            "#,
        ))
    }

    fn variant(rg: &ResourceGraph, key: &str) -> Option<String> {
        rg.meta.get(key).and_then(|m| m.variant()).map(str::to_string)
    }

    #[test]
    fn test_variants_recorded_without_touching_topology() {
        let fx = fixture();
        let mut rg = graph(&[("aws_lb.edge", "aws_instance.web")], &["aws_lb.plain"]);
        rg.meta.insert(
            "aws_lb.edge",
            meta_for("aws_lb.edge", 1).with_attr("load_balancer_type", "Network"),
        );
        rg.insert_node(
            "aws_db_instance.db",
            meta_for("aws_db_instance.db", 1).with_attr("engine", "aurora-postgresql"),
        );
        let edges_before = rg.graph.clone();

        fx.apply_twice(&DetectVariants, &mut rg);

        assert_eq!(rg.graph, edges_before);
        assert_eq!(variant(&rg, "aws_lb.edge").as_deref(), Some("aws_nlb"));
        assert_eq!(variant(&rg, "aws_lb.plain").as_deref(), Some("aws_alb"));
        // keywords are tried in sorted order: "aurora" before "postgres"
        assert_eq!(variant(&rg, "aws_db_instance.db").as_deref(), Some("aws_aurora"));
        assert_eq!(variant(&rg, "aws_instance.web"), None);
    }

    #[test]
    fn test_non_string_field_values() {
        let fx = fixture();
        let mut rg = ResourceGraph::new();
        rg.insert_node(
            "aws_lb.odd",
            meta_for("aws_lb.odd", 1).with_attr("load_balancer_type", serde_json::json!(["gateway"])),
        );
        DetectVariants.apply(&mut rg, &fx.cx()).unwrap();
        assert_eq!(variant(&rg, "aws_lb.odd").as_deref(), Some("aws_gwlb"));
    }
}
