use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::resource::ResourceGraph;

/// Stable reorder of graph keys by the provider's draw order.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplyDrawOrder;

impl Handler for ApplyDrawOrder {
    fn name(&self) -> &str {
        "apply_draw_order"
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Layout
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let meta = &rg.meta;
        rg.graph
            .sort_keys_by_rank(|key| cx.context.draw_rank(meta.resource_type(key)));
        Ok(())
    }
}
