use tracing::debug;

use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::key::NodeKey;
use crate::meta::{ATTR_SYNTHETIC, NodeMeta};
use crate::resource::ResourceGraph;

/// Adds the implicit edges named by the provider's auto-annotation rules,
/// e.g. every NAT gateway links to `aws_internet.internet`.
///
/// Link targets that do not exist yet are created as synthetic nodes, but only
/// when at least one node matches the rule.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoAnnotate;

impl Handler for AutoAnnotate {
    fn name(&self) -> &str {
        "auto_annotate"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::AutoAnnotation
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let mut added = 0usize;
        for rule in cx.context.auto_annotations() {
            let sources: Vec<NodeKey> = rg
                .keys_with_type_prefix(&rule.source)
                .into_iter()
                .filter(|key| !rule.link.contains(key))
                .filter(|key| rg.meta.get(key).is_none_or(|m| !m.attr_bool(ATTR_SYNTHETIC)))
                .collect();
            if sources.is_empty() {
                continue;
            }

            for target in &rule.link {
                if !rg.graph.contains(target) {
                    rg.insert_node(
                        target.clone(),
                        NodeMeta::new(cx.provider_name(), target.resource_type(), 1)
                            .with_attr(ATTR_SYNTHETIC, true),
                    );
                }
                for source in &sources {
                    let edge = if rule.reverse {
                        rg.graph.add_edge(target, source)
                    } else {
                        rg.graph.add_edge(source, target)
                    };
                    added += edge as usize;
                }
            }
        }
        debug!(added, "auto-annotated edges");
        Ok(())
    }
}
