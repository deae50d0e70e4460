//! Built-in handlers. Providers compose these into their declared sequences.

mod auto_annotate;
mod consolidate;
mod draw_order;
mod expand;
mod group;
mod intermediary;
mod overlay;
mod reverse;
mod variant;

pub use auto_annotate::AutoAnnotate;
pub use consolidate::Consolidate;
pub use draw_order::ApplyDrawOrder;
pub use expand::ExpandInstances;
pub use group::Group;
pub use intermediary::EliminateIntermediary;
pub use overlay::ApplyOverlay;
pub use reverse::Reverse;
pub use variant::DetectVariants;

use serde_json::Value;

use crate::key::NodeKey;
use crate::meta::{NodeMeta, reference_target};

/// Drop every reference to `target` from the given fields of `meta`.
/// Returns whether anything changed.
pub(crate) fn scrub_reference(meta: &mut NodeMeta, fields: &[String], target: &NodeKey) -> bool {
    let mut changed = false;
    for field in fields {
        let remove = match meta.attrs.get_mut(field.as_str()) {
            Some(Value::String(s)) => reference_target(s).as_ref() == Some(target),
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|item| {
                    item.as_str()
                        .and_then(reference_target)
                        .is_none_or(|key| &key != target)
                });
                changed |= before != items.len();
                false
            }
            _ => false,
        };
        if remove {
            meta.attrs.shift_remove(field.as_str());
            changed = true;
        }
    }
    changed
}
