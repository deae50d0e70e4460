pub mod annotation;
pub mod context;
pub mod engine;
pub mod graph;
pub mod handler;
pub mod handlers;
pub mod key;
pub mod meta;
pub mod node_factory;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod service;

pub use annotation::{AnnotationOverlay, KeyPattern};
pub use context::{
    AutoAnnotationRule, ConsolidationRule, ProviderConfig, ProviderContext, VariantRule,
};
pub use engine::{Engine, EngineOptions, EngineOutput, RunReport};
pub use graph::GraphStore;
pub use handler::{Handler, HandlerCtxt, HandlerKind, HandlerSequence, KeyFate, OwnerLookup};
pub use key::NodeKey;
pub use meta::{Metadata, NodeMeta};
pub use node_factory::{NodeFactory, NodeResolution};
pub use pipeline::{PipelineOutcome, ProviderFailure, SkippedHandler, run_pipeline};
pub use provider::{Capabilities, ClassRef, ConfigSource, Provider, ProviderDescriptor};
pub use registry::{DetectionResult, ProviderRegistry, UNKNOWN_PROVIDER};
pub use resource::ResourceGraph;
pub use service::{ServiceCategory, ServiceMapping};
pub use tfgraph_error::{Error, ErrorKind, Result};
