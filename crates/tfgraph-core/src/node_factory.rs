//! Resolution of resource types to renderable classes and icons.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ProviderContext;
use crate::meta::NodeMeta;
use crate::provider::Provider;
use crate::service::ServiceMapping;

/// Class used when neither the provider nor the service mapping knows a type.
pub const BLANK_CLASS: &str = "generic.blank.Blank";
pub const BLANK_ICON: &str = "generic/blank/blank.png";

/// Renderable class reference and icon path of one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeResolution {
    pub class_ref: String,
    pub icon_path: String,
}

impl NodeResolution {
    pub fn blank() -> Self {
        Self {
            class_ref: BLANK_CLASS.to_string(),
            icon_path: BLANK_ICON.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.class_ref == BLANK_CLASS
    }
}

type MemoKey = (String, &'static str, u64);

/// Memoizing resolver. One factory lives for one engine run.
#[derive(Debug)]
pub struct NodeFactory {
    services: Arc<ServiceMapping>,
    memo: DashMap<MemoKey, NodeResolution>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl NodeFactory {
    pub fn new(services: Arc<ServiceMapping>) -> Self {
        Self {
            services,
            memo: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Resolve `resource_type` for `provider`: provider class table, then the
    /// service category fallback, then the blank class.
    ///
    /// Memoized by type, provider and configuration revision, so a context
    /// rebuilt from changed configuration never sees stale entries.
    pub fn resolve(
        &self,
        resource_type: &str,
        provider: &dyn Provider,
        cx: &ProviderContext,
    ) -> NodeResolution {
        let key = (resource_type.to_string(), provider.name(), cx.revision());
        if let Some(hit) = self.memo.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return hit.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let resolution = self.resolve_uncached(resource_type, provider);
        self.memo.insert(key, resolution.clone());
        resolution
    }

    /// Resolve one node, preferring its variant over its raw type.
    pub fn resolve_meta(
        &self,
        meta: &NodeMeta,
        provider: &dyn Provider,
        cx: &ProviderContext,
    ) -> NodeResolution {
        if let Some(variant) = meta.variant() {
            let resolution = self.resolve(variant, provider, cx);
            if !resolution.is_blank() {
                return resolution;
            }
        }
        self.resolve(&meta.resource_type, provider, cx)
    }

    /// Drop every memoized entry of `provider`.
    pub fn invalidate(&self, provider: &str) {
        let before = self.memo.len();
        self.memo.retain(|(_, name, _), _| *name != provider);
        debug!(provider, dropped = before - self.memo.len(), "node factory invalidated");
    }

    pub fn cached(&self) -> usize {
        self.memo.len()
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (usize, usize) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn resolve_uncached(&self, resource_type: &str, provider: &dyn Provider) -> NodeResolution {
        if let Some(class) = provider.resolve_class(resource_type) {
            return NodeResolution {
                class_ref: class.class,
                icon_path: class.icon,
            };
        }
        let category = self.services.category(resource_type);
        if !category.is_generic() {
            return NodeResolution {
                class_ref: format!(
                    "generic.{}.{}",
                    category.domain(),
                    class_name(category.subdomain())
                ),
                icon_path: format!(
                    "generic/{}/{}.png",
                    category.domain(),
                    category.subdomain()
                ),
            };
        }
        NodeResolution::blank()
    }
}

/// `load_balancer` -> `LoadBalancer`
fn class_name(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
