use tracing::debug;

use tfgraph_error::{Error, Result};

use crate::handler::{Handler, HandlerCtxt, HandlerKind};
use crate::key::NodeKey;
use crate::resource::ResourceGraph;

/// Places every node of a child type under a node of a parent type.
///
/// The parent is taken from the child's parent-pointer field when one is
/// configured and resolves; otherwise an existing parent of the right type is
/// kept, and failing that the first parent in key order is used with a
/// warning. A moved child loses its `child -> parent` edge and any other
/// container of the same parent type.
#[derive(Debug, Clone)]
pub struct Group {
    child: String,
    parent: String,
    field: Option<String>,
    name: String,
}

impl Group {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        let child = child.into();
        let parent = parent.into();
        Self {
            name: format!("group_{child}_under_{parent}"),
            child,
            parent,
            field: None,
        }
    }

    /// Match children to parents through the metadata field `field`.
    pub fn via(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// The parent named by `child`'s pointer field, among `parents`.
    ///
    /// A reference to an expanded parent's base resolves to the instance with
    /// the child's own index, or the first instance.
    fn referenced_parent(
        &self,
        rg: &ResourceGraph,
        child: &NodeKey,
        parents: &[NodeKey],
    ) -> Option<NodeKey> {
        let field = self.field.as_deref()?;
        let target = rg.meta.get(child)?.reference(field)?;
        if parents.contains(&target) {
            return Some(target);
        }
        let same_base: Vec<&NodeKey> = parents
            .iter()
            .filter(|p| p.base() == target.base())
            .collect();
        same_base
            .iter()
            .find(|p| p.instance().is_some() && p.instance() == child.instance())
            .or_else(|| same_base.first())
            .map(|p| (*p).clone())
    }
}

impl Handler for Group {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Grouping
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let children = rg.keys_of_type(&self.child);
        if children.is_empty() {
            return Ok(());
        }
        let parents = rg.keys_of_type(&self.parent);
        if parents.is_empty() {
            return Err(Error::missing_resource(&self.parent, &self.child)
                .with_operation("handler::group")
                .with_context("handler", self.name.clone()));
        }

        let mut moved = 0usize;
        for child in &children {
            let current: Vec<NodeKey> = rg
                .graph
                .parents_of(child)
                .into_iter()
                .filter(|p| parents.contains(p))
                .collect();
            let target = match self.referenced_parent(rg, child, &parents) {
                Some(target) => target,
                None => match current.first() {
                    Some(existing) => existing.clone(),
                    None => {
                        let fallback = parents[0].clone();
                        cx.warn(
                            &self.name,
                            format!(
                                "no {} reference on '{child}'; placing it under '{fallback}'",
                                self.parent
                            ),
                        );
                        fallback
                    }
                },
            };

            for other in current.iter().filter(|p| **p != target) {
                rg.graph.remove_edge(other, child);
            }
            rg.graph.remove_edge(child, &target);
            if rg.graph.add_edge(&target, child) {
                moved += 1;
            }
        }

        debug!(handler = %self.name, children = children.len(), moved, "grouped resources");
        Ok(())
    }
}
