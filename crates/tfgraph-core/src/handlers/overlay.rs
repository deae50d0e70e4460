use tracing::{debug, info};

use tfgraph_error::Result;

use crate::annotation::KeyPattern;
use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::key::NodeKey;
use crate::meta::{ATTR_DISPLAY_ICON, ATTR_DISPLAY_LABEL, ATTR_HIDDEN, ATTR_SYNTHETIC, NodeMeta};
use crate::resource::ResourceGraph;

/// Applies the user's annotation overlay: edge removals, then edge additions,
/// then label, icon and visibility overrides.
///
/// A literal endpoint of an added edge that matches no node is created as a
/// synthetic node, unless another provider's partition owns that key. Edges
/// between partitions are left to the engine. Providers without the
/// annotations capability skip this.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplyOverlay;

const NAME: &str = "apply_overlay";

impl ApplyOverlay {
    fn endpoints(rg: &mut ResourceGraph, raw: &str, cx: &HandlerCtxt<'_>) -> Vec<NodeKey> {
        let pattern = KeyPattern::parse(raw);
        let matched = pattern.resolve(&rg.graph);
        if !matched.is_empty() {
            return matched;
        }
        match pattern.literal() {
            // Linked by the engine once every partition has run.
            Some(literal) if cx.is_foreign(literal) => Vec::new(),
            Some(literal) => {
                rg.insert_node(
                    literal.clone(),
                    NodeMeta::new(cx.provider_name(), literal.resource_type(), 1)
                        .with_attr(ATTR_SYNTHETIC, true),
                );
                vec![literal.clone()]
            }
            None if cx.is_partitioned() => Vec::new(),
            None => {
                cx.warn(NAME, format!("pattern '{raw}' matches no node"));
                Vec::new()
            }
        }
    }

    fn set_all(rg: &mut ResourceGraph, raw: &str, attr: &str, value: serde_json::Value) -> usize {
        let keys = KeyPattern::parse(raw).resolve(&rg.graph);
        for key in &keys {
            if let Some(meta) = rg.meta.get_mut(key) {
                meta.set_attr(attr, value.clone());
            }
        }
        keys.len()
    }
}

impl Handler for ApplyOverlay {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Overlay
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let overlay = cx.overlay;
        if overlay.is_empty() {
            return Ok(());
        }
        if !cx.provider.descriptor().capabilities.annotations {
            info!(provider = cx.provider_name(), "provider does not support annotations, overlay skipped");
            return Ok(());
        }

        let mut removed = 0usize;
        for (from, to) in &overlay.remove_edges {
            let froms = KeyPattern::parse(from).resolve(&rg.graph);
            let tos = KeyPattern::parse(to).resolve(&rg.graph);
            for f in &froms {
                for t in &tos {
                    removed += rg.graph.remove_edge(f, t) as usize;
                }
            }
        }

        let mut added = 0usize;
        for (from, to) in &overlay.add_edges {
            let froms = Self::endpoints(rg, from, cx);
            let tos = Self::endpoints(rg, to, cx);
            for f in &froms {
                for t in tos.iter().filter(|t| *t != f) {
                    added += rg.graph.add_edge(f, t) as usize;
                }
            }
        }

        let mut overridden = 0usize;
        for (pattern, label) in &overlay.labels {
            overridden += Self::set_all(rg, pattern, ATTR_DISPLAY_LABEL, label.as_str().into());
        }
        for (pattern, icon) in &overlay.icons {
            overridden += Self::set_all(rg, pattern, ATTR_DISPLAY_ICON, icon.as_str().into());
        }
        for pattern in &overlay.hidden {
            overridden += Self::set_all(rg, pattern, ATTR_HIDDEN, true.into());
        }

        debug!(removed, added, overridden, "applied annotation overlay");
        Ok(())
    }
}
