//! The pipeline orchestrator.
//!
//! A run detects the providers present in the input, partitions the graph per
//! provider, runs each provider's declared handler sequence on its partition
//! (optionally in parallel), stitches cross-provider edges and overlay edges
//! back, resolves every node to a renderable class and validates the result.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use tfgraph_error::{Error, Result};

use crate::annotation::{AnnotationOverlay, KeyPattern};
use crate::context::ProviderContext;
use crate::graph::GraphStore;
use crate::handler::{HandlerCtxt, KeyFate, OwnerLookup};
use crate::key::NodeKey;
use crate::node_factory::{NodeFactory, NodeResolution};
use crate::pipeline::{ProviderFailure, SkippedHandler, run_pipeline};
use crate::provider::Provider;
use crate::registry::{DetectionResult, ProviderRegistry};
use crate::resource::ResourceGraph;
use crate::service::ServiceMapping;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Run independent provider partitions on the rayon pool.
    pub parallel: bool,
    /// Fail the run when validation reports issues after the pipeline.
    pub strict: bool,
    /// Provider used when detection classifies nothing.
    pub fallback_provider: String,
    /// Skip detection and treat every node as belonging to this provider.
    pub provider: Option<String>,
    /// Attach a `NodeResolution` to every node.
    pub resolve_nodes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            strict: false,
            fallback_provider: "aws".to_string(),
            provider: None,
            resolve_nodes: true,
        }
    }
}

impl EngineOptions {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_fallback_provider(mut self, provider: impl Into<String>) -> Self {
        self.fallback_provider = provider.into();
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_resolve_nodes(mut self, resolve_nodes: bool) -> Self {
        self.resolve_nodes = resolve_nodes;
        self
    }
}

/// What happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub detection: DetectionResult,
    /// Provider that received unclassified nodes.
    pub primary: Option<String>,
    /// Handlers applied, per provider, in order.
    pub applied: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<String>,
    pub skipped: Vec<SkippedHandler>,
    pub failures: Vec<ProviderFailure>,
    pub issues_before: Vec<String>,
    pub issues_after: Vec<String>,
    pub elapsed_seconds: f64,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// No failures and nothing left for validation to report.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.issues_after.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub graph: ResourceGraph,
    pub report: RunReport,
}

struct Partition {
    provider: Arc<dyn Provider>,
    context: Option<Arc<ProviderContext>>,
    graph: ResourceGraph,
}

struct PartitionResult {
    provider: &'static str,
    graph: ResourceGraph,
    applied: Vec<String>,
    skipped: Vec<SkippedHandler>,
    warnings: Vec<String>,
    fates: Vec<(NodeKey, KeyFate)>,
    failure: Option<ProviderFailure>,
}

impl PartitionResult {
    fn untouched(provider: &'static str, graph: ResourceGraph, failure: Option<ProviderFailure>) -> Self {
        Self {
            provider,
            graph,
            applied: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            fates: Vec::new(),
            failure,
        }
    }
}

pub struct Engine {
    registry: Arc<ProviderRegistry>,
    services: Arc<ServiceMapping>,
    options: EngineOptions,
}

impl Engine {
    /// Build an engine over `registry`. The service mapping starts from the
    /// built-in table and takes every registered provider's categories.
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let mut services = ServiceMapping::builtin();
        for provider in registry.providers() {
            services.extend_static(provider.service_categories());
        }
        Self {
            registry,
            services: Arc::new(services),
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn services(&self) -> &ServiceMapping {
        &self.services
    }

    /// Transform `input` into the diagram-ready graph.
    ///
    /// Provider failures are reported, not returned: the failing provider's
    /// nodes keep their last consistent state and other providers proceed.
    /// Errors are returned for unknown forced or fallback providers, and for
    /// validation issues in strict mode.
    pub fn run(&self, input: ResourceGraph, overlay: &AnnotationOverlay) -> Result<EngineOutput> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);
        let _enter = span.enter();
        let start = Instant::now();

        self.registry.seal();
        self.registry.clear_contexts();

        let detection = self.registry.detect(input.graph.keys());
        let forced = match &self.options.provider {
            Some(name) => Some(self.registry.provider(name)?.name()),
            None => None,
        };
        let primary: Option<&'static str> = match (forced, detection.primary.as_deref()) {
            (Some(name), _) => Some(name),
            (None, Some(name)) => Some(self.registry.provider(name)?.name()),
            (None, None) if input.is_empty() => None,
            (None, None) => {
                let fallback = self.registry.provider(&self.options.fallback_provider)?;
                warn!(fallback = fallback.name(), "no provider detected, using fallback");
                Some(fallback.name())
            }
        };

        // Assign every node to the provider whose pipeline will transform it.
        let mut owners: HashMap<NodeKey, &'static str> = HashMap::new();
        let mut members: BTreeMap<&'static str, HashSet<NodeKey>> = BTreeMap::new();
        for key in input.graph.keys() {
            let owner = match forced {
                Some(name) => Some(name),
                None => self.registry.classify(key).or(primary),
            };
            if let Some(owner) = owner {
                owners.insert(key.clone(), owner);
                members.entry(owner).or_default().insert(key.clone());
            }
        }

        let mut failures = Vec::new();
        let mut contexts: HashMap<&'static str, Arc<ProviderContext>> = HashMap::new();
        for &name in members.keys() {
            match self.registry.get_context(name) {
                Ok(cx) => {
                    contexts.insert(name, cx);
                }
                Err(err) => {
                    warn!(provider = name, "provider configuration failed: {err}");
                    failures.push(ProviderFailure::new(name, None, &err));
                }
            }
        }
        let mut parent_fields: Vec<String> = contexts
            .values()
            .flat_map(|cx| cx.parent_fields().iter().cloned())
            .collect();
        parent_fields.sort();
        parent_fields.dedup();
        let issues_before = input.validate(&parent_fields);
        if !issues_before.is_empty() {
            info!(issues = issues_before.len(), "input has validation issues");
        }

        let cross_edges: Vec<(NodeKey, NodeKey)> = input
            .graph
            .edges()
            .filter(|(p, c)| owners.get(*p) != owners.get(*c))
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect();
        // Keys the input does not name, such as overlay targets, belong to
        // the partition their type classifies into, else the primary's.
        let owner_of = |key: &NodeKey| -> Option<&'static str> {
            owners
                .get(key)
                .or_else(|| owners.get(key.base()))
                .copied()
                .or(forced)
                .or_else(|| self.registry.classify(key).filter(|name| members.contains_key(name)))
                .or(primary)
        };
        let partitioned = members.len() > 1;
        let lookup = partitioned.then_some(&owner_of as OwnerLookup<'_>);
        let partitions = self.partition(input, &members, &contexts)?;

        let results: Vec<PartitionResult> = if self.options.parallel && partitions.len() > 1 {
            partitions
                .into_par_iter()
                .map(|part| self.run_partition(part, overlay, lookup))
                .collect()
        } else {
            partitions
                .into_iter()
                .map(|part| self.run_partition(part, overlay, lookup))
                .collect()
        };

        let mut output = ResourceGraph::new();
        let mut applied = BTreeMap::new();
        let mut warnings = Vec::new();
        let mut skipped = Vec::new();
        let mut fates: HashMap<NodeKey, KeyFate> = HashMap::new();
        let mut placed: HashMap<NodeKey, &'static str> = HashMap::new();
        for result in results {
            for key in result.graph.graph.keys() {
                placed.entry(key.clone()).or_insert(result.provider);
            }
            output.merge(result.graph);
            applied.insert(result.provider.to_string(), result.applied);
            warnings.extend(result.warnings);
            skipped.extend(result.skipped);
            fates.extend(result.fates);
            failures.extend(result.failure);
        }
        warnings.extend(restore_cross_edges(&mut output, &cross_edges, &fates));
        if partitioned {
            warnings.extend(self.apply_cross_overlay(&mut output, overlay, &placed));
        }

        if self.options.resolve_nodes {
            self.resolve_nodes(&mut output, &owners, primary, &contexts);
        }

        let issues_after = output.validate(&parent_fields);
        let report = RunReport {
            run_id,
            detection,
            primary: primary.map(str::to_string),
            applied,
            warnings,
            skipped,
            failures,
            issues_before,
            issues_after,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        info!(
            nodes = output.len(),
            edges = output.graph.edge_count(),
            warnings = report.warnings.len(),
            skipped = report.skipped.len(),
            failures = report.failures.len(),
            "run finished in {:.3}s",
            report.elapsed_seconds
        );

        if self.options.strict && !report.issues_after.is_empty() {
            return Err(Error::invariant_violation(format!(
                "{} validation issue(s) after transformation: {}",
                report.issues_after.len(),
                report.issues_after.join("; ")
            ))
            .with_operation("engine::run")
            .with_context("run_id", run_id.to_string()));
        }
        Ok(EngineOutput {
            graph: output,
            report,
        })
    }

    fn partition(
        &self,
        mut input: ResourceGraph,
        members: &BTreeMap<&'static str, HashSet<NodeKey>>,
        contexts: &HashMap<&'static str, Arc<ProviderContext>>,
    ) -> Result<Vec<Partition>> {
        let single = members.len() == 1;
        let mut partitions = Vec::with_capacity(members.len());
        for (&name, keys) in members {
            let graph = if single {
                std::mem::take(&mut input)
            } else {
                input.subgraph(keys)
            };
            debug!(provider = name, nodes = graph.len(), "partitioned graph");
            partitions.push(Partition {
                provider: self.registry.provider(name)?,
                context: contexts.get(name).cloned(),
                graph,
            });
        }
        Ok(partitions)
    }

    fn run_partition(
        &self,
        part: Partition,
        overlay: &AnnotationOverlay,
        owner_of: Option<OwnerLookup<'_>>,
    ) -> PartitionResult {
        let name = part.provider.name();
        let mut graph = part.graph;

        // Without a context the nodes pass through untransformed.
        let Some(context) = part.context else {
            return PartitionResult::untouched(name, graph, None);
        };
        let handlers = match part.provider.handlers() {
            Ok(handlers) => handlers,
            Err(err) => {
                warn!(provider = name, "invalid handler declaration: {err}");
                let failure = ProviderFailure::new(name, None, &err);
                return PartitionResult::untouched(name, graph, Some(failure));
            }
        };

        let mut cx = HandlerCtxt::new(part.provider.as_ref(), &context, overlay, &self.services);
        if let Some(owner_of) = owner_of {
            cx = cx.with_owners(owner_of);
        }
        let outcome = run_pipeline(&mut graph, &handlers, &cx);
        PartitionResult {
            provider: name,
            graph,
            applied: outcome.applied,
            skipped: outcome.skipped,
            warnings: outcome.warnings,
            fates: outcome.fates,
            failure: outcome.failure,
        }
    }

    /// Apply overlay edge directives whose endpoints ended up in different
    /// partitions. At least one endpoint's provider must support annotations.
    fn apply_cross_overlay(
        &self,
        output: &mut ResourceGraph,
        overlay: &AnnotationOverlay,
        placed: &HashMap<NodeKey, &'static str>,
    ) -> Vec<String> {
        if overlay.add_edges.is_empty() && overlay.remove_edges.is_empty() {
            return Vec::new();
        }
        let annotates = |key: &NodeKey| {
            placed
                .get(key)
                .and_then(|name| self.registry.provider(name).ok())
                .is_some_and(|provider| provider.descriptor().capabilities.annotations)
        };
        let crosses = |a: &NodeKey, b: &NodeKey| {
            a != b && placed.get(a) != placed.get(b) && (annotates(a) || annotates(b))
        };
        let resolve = |graph: &GraphStore, raw: &str| KeyPattern::parse(raw).resolve(graph);

        let mut removed = 0usize;
        for (from, to) in &overlay.remove_edges {
            let tos = resolve(&output.graph, to);
            for f in resolve(&output.graph, from) {
                for t in tos.iter().filter(|t| crosses(&f, *t)) {
                    removed += output.graph.remove_edge(&f, t) as usize;
                }
            }
        }

        let mut warnings = Vec::new();
        let mut added = 0usize;
        for (from, to) in &overlay.add_edges {
            let froms = resolve(&output.graph, from);
            let tos = resolve(&output.graph, to);
            if froms.is_empty() || tos.is_empty() {
                let missing = if froms.is_empty() { from } else { to };
                let warning = format!("overlay edge '{from}' -> '{to}' skipped: '{missing}' matches no node");
                warn!("{warning}");
                warnings.push(warning);
                continue;
            }
            for f in &froms {
                for t in tos.iter().filter(|t| crosses(f, *t)) {
                    added += output.graph.add_edge(f, t) as usize;
                }
            }
        }
        debug!(removed, added, "applied cross-partition overlay edges");
        warnings
    }

    fn resolve_nodes(
        &self,
        output: &mut ResourceGraph,
        owners: &HashMap<NodeKey, &'static str>,
        primary: Option<&'static str>,
        contexts: &HashMap<&'static str, Arc<ProviderContext>>,
    ) {
        let factory = NodeFactory::new(self.services.clone());
        for (key, meta) in output.meta.iter_mut() {
            let provider = self
                .registry
                .provider(&meta.provider)
                .ok()
                .or_else(|| {
                    let name = owners
                        .get(key)
                        .copied()
                        .or_else(|| self.registry.classify(key))
                        .or(primary)?;
                    self.registry.provider(name).ok()
                });
            let resolution = match provider {
                Some(provider) => match contexts.get(provider.name()) {
                    Some(cx) => factory.resolve_meta(meta, provider.as_ref(), cx),
                    None => NodeResolution::blank(),
                },
                None => NodeResolution::blank(),
            };
            meta.resolution = Some(resolution);
        }
        let (hits, misses) = factory.stats();
        debug!(hits, misses, "resolved node classes");
    }
}

/// Re-add edges that crossed provider partitions, mapped onto final keys.
///
/// Endpoints are followed through what their partition did to them: expanded
/// keys map to their instances, merged keys to their container, eliminated
/// intermediaries to their neighbours on the relevant side (including ones
/// reached through another cross edge). Pairs of expanded endpoints with equal
/// counts are suffix matched. An edge is dropped with a warning only when an
/// endpoint maps to nothing.
fn restore_cross_edges(
    output: &mut ResourceGraph,
    edges: &[(NodeKey, NodeKey)],
    fates: &HashMap<NodeKey, KeyFate>,
) -> Vec<String> {
    if edges.is_empty() {
        return Vec::new();
    }

    let mut warnings = Vec::new();
    let mut pending = Vec::new();
    {
        let resolver = CrossResolver::new(&output.graph, edges, fates);
        for (parent, child) in edges {
            let parents = resolver.resolve(parent, Side::Parent);
            let children = resolver.resolve(child, Side::Child);
            if parents.is_empty() || children.is_empty() {
                warnings.push(format!(
                    "cross-provider edge '{parent}' -> '{child}' dropped: endpoint no longer exists"
                ));
                continue;
            }
            if parents.len() == children.len() && parents.len() > 1 {
                pending.extend(parents.into_iter().zip(children));
            } else {
                for p in &parents {
                    for c in &children {
                        pending.push((p.clone(), c.clone()));
                    }
                }
            }
        }
    }
    for (parent, child) in pending {
        if parent != child {
            output.graph.add_edge(&parent, &child);
        }
    }
    for warning in &warnings {
        warn!("{warning}");
    }
    warnings
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Parent,
    Child,
}

/// Maps keys of the input onto the keys that replaced them.
struct CrossResolver<'a> {
    graph: &'a GraphStore,
    fates: &'a HashMap<NodeKey, KeyFate>,
    instances: HashMap<&'a str, Vec<&'a NodeKey>>,
    cross_parents: HashMap<&'a NodeKey, Vec<&'a NodeKey>>,
    cross_children: HashMap<&'a NodeKey, Vec<&'a NodeKey>>,
}

impl<'a> CrossResolver<'a> {
    fn new(
        graph: &'a GraphStore,
        edges: &'a [(NodeKey, NodeKey)],
        fates: &'a HashMap<NodeKey, KeyFate>,
    ) -> Self {
        let mut instances: HashMap<&str, Vec<&NodeKey>> = HashMap::new();
        for key in graph.keys().filter(|k| k.is_instance()) {
            instances.entry(key.base()).or_default().push(key);
        }
        let mut cross_parents: HashMap<&NodeKey, Vec<&NodeKey>> = HashMap::new();
        let mut cross_children: HashMap<&NodeKey, Vec<&NodeKey>> = HashMap::new();
        for (parent, child) in edges {
            cross_children.entry(parent).or_default().push(child);
            cross_parents.entry(child).or_default().push(parent);
        }
        Self {
            graph,
            fates,
            instances,
            cross_parents,
            cross_children,
        }
    }

    /// Final keys standing in for `key` on the given side of an edge.
    fn resolve(&self, key: &NodeKey, side: Side) -> Vec<NodeKey> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect(key, side, &mut seen, &mut out);
        out
    }

    fn collect(&self, key: &NodeKey, side: Side, seen: &mut HashSet<NodeKey>, out: &mut Vec<NodeKey>) {
        if !seen.insert(key.clone()) {
            return;
        }
        if self.graph.contains(key) {
            if !out.contains(key) {
                out.push(key.clone());
            }
            return;
        }
        let next: Vec<&NodeKey> = match self.fates.get(key) {
            Some(KeyFate::Merged(target)) => vec![target],
            Some(KeyFate::Expanded(instances)) => instances.iter().collect(),
            Some(KeyFate::Eliminated { parents, children }) => {
                let (local, cross) = match side {
                    Side::Parent => (parents, &self.cross_parents),
                    Side::Child => (children, &self.cross_children),
                };
                local
                    .iter()
                    .chain(cross.get(key).into_iter().flatten().copied())
                    .collect()
            }
            None => self.instances.get(key.as_str()).cloned().unwrap_or_default(),
        };
        for next in next {
            self.collect(next, side, seen, out);
        }
    }
}
