//! The handler abstraction and the declared handler sequence.
//!
//! A handler is one named transformation over a [`ResourceGraph`]. Providers
//! declare their handlers as a [`HandlerSequence`]; the order in that sequence
//! is the order the pipeline applies them, so reordering is a visible change to
//! the provider's declaration rather than a side effect of call order.

use std::fmt;

use parking_lot::Mutex;
use strum_macros::{Display, IntoStaticStr};
use tracing::warn;

use tfgraph_error::{Error, Result};

use crate::annotation::AnnotationOverlay;
use crate::context::ProviderContext;
use crate::key::NodeKey;
use crate::provider::Provider;
use crate::resource::ResourceGraph;
use crate::service::ServiceMapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum HandlerKind {
    /// Merge a family of resource types into one container node.
    Consolidation,
    /// Expand repeated resources into numbered instances.
    Expansion,
    /// Replace `A -> intermediary -> B` with `A -> B`.
    Intermediary,
    /// Re-parent children under their logical container.
    Grouping,
    /// Turn `wrapped -> wrapper` edges into `wrapper -> wrapped`.
    Reversal,
    /// Record a display variant from metadata.
    VariantDetection,
    /// Add implicit edges derived from resource types.
    AutoAnnotation,
    /// Apply user annotation directives.
    Overlay,
    /// Reorder nodes for layout.
    Layout,
}

/// What became of a key a handler removed from the graph.
///
/// The engine reads these to re-attach edges that crossed into the partition
/// from another provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFate {
    /// Merged into a container node.
    Merged(NodeKey),
    /// Replaced by its numbered instances.
    Expanded(Vec<NodeKey>),
    /// Collapsed into direct edges. `parents` and `children` are its
    /// neighbours at the time it was removed.
    Eliminated {
        parents: Vec<NodeKey>,
        children: Vec<NodeKey>,
    },
}

/// Finds the provider whose partition owns a key in the current run.
pub type OwnerLookup<'a> = &'a (dyn Fn(&NodeKey) -> Option<&'static str> + Sync);

/// Everything a handler may read besides the graph it mutates.
pub struct HandlerCtxt<'a> {
    pub provider: &'a dyn Provider,
    pub context: &'a ProviderContext,
    pub overlay: &'a AnnotationOverlay,
    pub services: &'a ServiceMapping,
    owner_of: Option<OwnerLookup<'a>>,
    warnings: Mutex<Vec<String>>,
    fates: Mutex<Vec<(NodeKey, KeyFate)>>,
}

impl<'a> HandlerCtxt<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        context: &'a ProviderContext,
        overlay: &'a AnnotationOverlay,
        services: &'a ServiceMapping,
    ) -> Self {
        Self {
            provider,
            context,
            overlay,
            services,
            owner_of: None,
            warnings: Mutex::new(Vec::new()),
            fates: Mutex::new(Vec::new()),
        }
    }

    /// Mark the graph as one partition of a multi-provider run.
    pub fn with_owners(mut self, owner_of: OwnerLookup<'a>) -> Self {
        self.owner_of = Some(owner_of);
        self
    }

    /// Whether other providers transform the rest of the input in this run.
    pub fn is_partitioned(&self) -> bool {
        self.owner_of.is_some()
    }

    /// Whether `key` belongs to another provider's partition.
    pub fn is_foreign(&self, key: &NodeKey) -> bool {
        self.owner_of
            .and_then(|owner_of| owner_of(key))
            .is_some_and(|owner| owner != self.provider_name())
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Record a user-facing warning on behalf of `handler`.
    pub fn warn(&self, handler: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(provider = self.provider_name(), handler, "{message}");
        self.warnings
            .lock()
            .push(format!("[{}/{}] {}", self.provider_name(), handler, message));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.lock().len()
    }

    /// Warnings recorded so far, clearing the sink.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut *self.warnings.lock())
    }

    pub fn record_fate(&self, key: NodeKey, fate: KeyFate) {
        self.fates.lock().push((key, fate));
    }

    pub fn fate_count(&self) -> usize {
        self.fates.lock().len()
    }

    /// Forget fates recorded after the first `len`, for a rolled back handler.
    pub fn truncate_fates(&self, len: usize) {
        self.fates.lock().truncate(len);
    }

    /// Fates recorded so far, in order, clearing the sink.
    pub fn take_fates(&self) -> Vec<(NodeKey, KeyFate)> {
        std::mem::take(&mut *self.fates.lock())
    }
}

pub trait Handler: Send + Sync {
    /// Unique name within a sequence, e.g. `group_aws_subnet_under_aws_vpc`.
    fn name(&self) -> &str;

    fn kind(&self) -> HandlerKind;

    /// Transform `graph` in place. Applying a handler to its own output is a no-op.
    fn apply(&self, graph: &mut ResourceGraph, cx: &HandlerCtxt<'_>) -> Result<()>;
}

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.kind())
    }
}

/// A provider's handlers in their declared order.
#[derive(Debug, Default)]
pub struct HandlerSequence {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerSequence {
    /// Validate and wrap a declared order.
    ///
    /// Rejects duplicate handler names, and intermediary elimination declared
    /// before instance expansion (it would match against stale keys).
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Result<Self> {
        for (i, handler) in handlers.iter().enumerate() {
            if handlers[..i].iter().any(|h| h.name() == handler.name()) {
                return Err(Error::config_invalid(format!(
                    "handler '{}' is declared twice",
                    handler.name()
                ))
                .with_operation("handler::sequence"));
            }
        }

        let last_expansion = handlers
            .iter()
            .rposition(|h| h.kind() == HandlerKind::Expansion);
        let first_intermediary = handlers
            .iter()
            .position(|h| h.kind() == HandlerKind::Intermediary);
        if let (Some(expansion), Some(intermediary)) = (last_expansion, first_intermediary)
            && intermediary < expansion
        {
            return Err(Error::config_invalid(format!(
                "'{}' must run after '{}'",
                handlers[intermediary].name(),
                handlers[expansion].name()
            ))
            .with_operation("handler::sequence"));
        }

        Ok(Self { handlers })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Handler> {
        self.handlers.iter().map(|h| h.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.iter().find(|h| h.name() == name)
    }

    /// `(name, kind)` of every handler, in order.
    pub fn describe(&self) -> Vec<(String, HandlerKind)> {
        self.iter()
            .map(|h| (h.name().to_string(), h.kind()))
            .collect()
    }
}
