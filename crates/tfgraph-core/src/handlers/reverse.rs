use tracing::debug;

use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::meta::ATTR_WRAPPED;
use crate::resource::ResourceGraph;

/// Flips `wrapped -> wrapper` edges so the wrapper contains what it protects.
///
/// For each wrapper `W` and each node `X` pointing at it, `X -> W` is replaced
/// by `W -> X`, and every other (non-wrapper) parent `Y` of `X` now points at
/// `W` instead of `X`. Processed wrappers are marked `wrapped = true`.
#[derive(Debug, Clone)]
pub struct Reverse {
    wrapper: String,
    name: String,
}

impl Reverse {
    pub fn new(wrapper: impl Into<String>) -> Self {
        let wrapper = wrapper.into();
        Self {
            name: format!("reverse_{wrapper}"),
            wrapper,
        }
    }
}

impl Handler for Reverse {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Reversal
    }

    fn apply(&self, rg: &mut ResourceGraph, _cx: &HandlerCtxt<'_>) -> Result<()> {
        let wrappers = rg.keys_of_type(&self.wrapper);
        let mut reversed = 0usize;
        for wrapper in &wrappers {
            let Some(meta) = rg.meta.get(wrapper) else {
                continue;
            };
            if meta.attr_bool(ATTR_WRAPPED) {
                continue;
            }

            let wrapped: Vec<_> = rg
                .graph
                .parents_of(wrapper)
                .into_iter()
                .filter(|x| !wrappers.contains(x))
                .collect();
            for x in &wrapped {
                rg.graph.remove_edge(x, wrapper);
                for y in rg.graph.parents_of(x) {
                    if y != *wrapper && !wrappers.contains(&y) {
                        rg.graph.replace_child(&y, x, wrapper);
                    }
                }
                rg.graph.add_edge(wrapper, x);
                reversed += 1;
            }

            if let Some(meta) = rg.meta.get_mut(wrapper) {
                meta.set_attr(ATTR_WRAPPED, true);
            }
        }
        debug!(handler = %self.name, wrappers = wrappers.len(), reversed, "reversed wrapper edges");
        Ok(())
    }
}
