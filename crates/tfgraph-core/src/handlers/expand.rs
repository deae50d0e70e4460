use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use tfgraph_error::Result;

use crate::handler::{Handler, HandlerCtxt, HandlerKind, KeyFate};
use crate::key::NodeKey;
use crate::meta::reference_target;
use crate::resource::ResourceGraph;

/// Expands resources declared with `count > 1` into `~1..~N` instances.
///
/// Edges are rewired per pair of endpoints:
///
/// - plural to plural with equal counts: suffix matched, `~i -> ~i`
/// - plural to singular, or singular to plural: the singular side is broadcast
/// - plural counts `N != M`: index `i` in `1..=max(N, M)` pairs instance
///   `(i - 1) % N + 1` with `(i - 1) % M + 1`, and a warning is recorded
///
/// Parent-pointer fields of the new instances are rewritten to the instance
/// they were matched with. Instance metadata keeps the declared count.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpandInstances;

const NAME: &str = "expand_instances";

/// Pairs of 1-based instance indices to connect for counts `n` and `m`.
pub(crate) fn pair_indices(n: usize, m: usize) -> Vec<(usize, usize)> {
    (0..n.max(m)).map(|i| (i % n + 1, i % m + 1)).collect()
}

impl Handler for ExpandInstances {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Expansion
    }

    fn apply(&self, rg: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()> {
        let plural: HashMap<NodeKey, usize> = rg
            .graph
            .keys()
            .filter(|key| !key.is_instance())
            .filter_map(|key| {
                let count = rg.meta.get(key)?.count as usize;
                (count > 1).then(|| (key.clone(), count))
            })
            .collect();
        if plural.is_empty() {
            return Ok(());
        }
        let count_of = |key: &NodeKey| plural.get(key).copied();

        // Instances are appended in the key order of their bases.
        let order: Vec<NodeKey> = rg
            .graph
            .keys()
            .filter(|key| plural.contains_key(*key))
            .cloned()
            .collect();
        for key in order {
            let Some(n) = count_of(&key) else { continue };
            let Some(meta) = rg.meta.get(&key).cloned() else { continue };
            for i in 1..=n {
                rg.insert_node(key.with_instance(i), meta.clone());
            }
        }

        let edges: Vec<(NodeKey, NodeKey)> = rg
            .graph
            .edges()
            .filter(|(p, c)| plural.contains_key(*p) || plural.contains_key(*c))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        for (parent, child) in &edges {
            if parent == child {
                continue;
            }
            match (count_of(parent), count_of(child)) {
                (Some(n), Some(m)) => {
                    if n != m {
                        cx.warn(
                            NAME,
                            format!(
                                "'{parent}' has {n} instances but '{child}' has {m}; pairing by index modulo count"
                            ),
                        );
                    }
                    for (i, j) in pair_indices(n, m) {
                        rg.graph
                            .add_edge(parent.with_instance(i).as_str(), child.with_instance(j).as_str());
                    }
                }
                (Some(n), None) => {
                    for i in 1..=n {
                        rg.graph.add_edge(parent.with_instance(i).as_str(), child);
                    }
                }
                (None, Some(m)) => {
                    for j in 1..=m {
                        rg.graph.add_edge(parent, child.with_instance(j).as_str());
                    }
                }
                (None, None) => {}
            }
        }

        for (key, &n) in &plural {
            rg.remove_resource(key);
            let instances = (1..=n).map(|i| key.with_instance(i)).collect();
            cx.record_fate(key.clone(), KeyFate::Expanded(instances));
        }
        rewrite_parent_fields(rg, cx.context.parent_fields(), &plural);

        debug!(expanded = plural.len(), "expanded repeated resources");
        Ok(())
    }
}

/// Point parent-pointer fields at expanded instances instead of removed bases.
fn rewrite_parent_fields(
    rg: &mut ResourceGraph,
    fields: &[String],
    plural: &HashMap<NodeKey, usize>,
) {
    for (key, meta) in rg.meta.iter_mut() {
        for field in fields {
            let Some(value) = meta.attrs.get_mut(field.as_str()) else {
                continue;
            };
            let rewritten = match value {
                Value::String(raw) => match rewrite_reference(raw, key, plural) {
                    Some(new) => Some(Value::String(new)),
                    None => expand_all(raw, plural).map(Value::Array),
                },
                Value::Array(items) => {
                    let mut changed = false;
                    let items: Vec<Value> = items
                        .iter()
                        .flat_map(|item| match item.as_str() {
                            Some(raw) => match rewrite_reference(raw, key, plural) {
                                Some(new) => {
                                    changed = true;
                                    vec![Value::String(new)]
                                }
                                None => match expand_all(raw, plural) {
                                    Some(all) => {
                                        changed = true;
                                        all
                                    }
                                    None => vec![item.clone()],
                                },
                            },
                            None => vec![item.clone()],
                        })
                        .collect();
                    changed.then_some(Value::Array(items))
                }
                _ => None,
            };
            if let Some(new) = rewritten {
                *value = new;
            }
        }
    }
}

/// The instance of a referenced plural resource matched with `owner`.
fn rewrite_reference(raw: &str, owner: &NodeKey, plural: &HashMap<NodeKey, usize>) -> Option<String> {
    let target = reference_target(raw)?;
    let m = *plural.get(&target)?;
    let index = owner.instance()?;
    let n = plural.get(&NodeKey::from(owner.base())).copied().unwrap_or(index);
    let j = if n == m { index } else { (index - 1) % m + 1 };
    Some(raw.replacen(target.as_str(), target.with_instance(j).as_str(), 1))
}

/// Every instance of a referenced plural resource, for owners that are not instances.
fn expand_all(raw: &str, plural: &HashMap<NodeKey, usize>) -> Option<Vec<Value>> {
    let target = reference_target(raw)?;
    let m = *plural.get(&target)?;
    Some(
        (1..=m)
            .map(|j| Value::String(raw.replacen(target.as_str(), target.with_instance(j).as_str(), 1)))
            .collect(),
    )
}
