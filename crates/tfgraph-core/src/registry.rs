//! Registry of available providers.
//!
//! The registry is an explicit instance built at startup and handed to the
//! engine. Registration happens before any detection; once the registry is
//! sealed (by the first [`ProviderRegistry::detect`] call or by the engine at
//! the start of a run) further registrations are rejected.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use tfgraph_error::{Error, Result};

use crate::context::ProviderContext;
use crate::key::resource_type_of;
use crate::provider::{Provider, ProviderDescriptor};

/// Bucket name for keys no provider claims.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Outcome of provider detection over a set of node keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    /// Detected providers, excluding the unknown bucket.
    pub providers: BTreeSet<String>,
    /// Provider with the most keys; ties broken alphabetically.
    pub primary: Option<String>,
    /// Keys per provider, plus `unknown` when any key was unclassified.
    pub counts: BTreeMap<String, usize>,
    /// Classified keys / total keys.
    pub confidence: f64,
    pub unknown: Vec<String>,
}

impl DetectionResult {
    /// The primary provider, or `fallback` when nothing was detected.
    pub fn primary_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.primary.as_deref().unwrap_or(fallback)
    }

    pub fn is_mixed(&self) -> bool {
        self.providers.len() > 1
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    /// Providers in registration order
    providers: Vec<Arc<dyn Provider>>,
    /// Lower-cased name or alias -> index into `providers`
    names: HashMap<String, usize>,
    /// Loaded contexts for the current run
    contexts: RwLock<HashMap<&'static str, Arc<ProviderContext>>>,
    sealed: AtomicBool,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider. Fails if its name or an alias is already taken or
    /// if the registry is sealed.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> Result<()> {
        let descriptor = provider.descriptor();
        if self.is_sealed() {
            return Err(Error::registry_sealed(descriptor.name).with_operation("registry::register"));
        }
        for name in descriptor.names() {
            let lowered = name.to_ascii_lowercase();
            if let Some(&existing) = self.names.get(&lowered) {
                let existing = self.providers[existing].name();
                return Err(
                    Error::provider_conflict(name, existing).with_operation("registry::register")
                );
            }
        }
        // Catch an alias repeating the provider's own name.
        let mut own: Vec<String> = descriptor.names().map(str::to_ascii_lowercase).collect();
        own.sort();
        own.dedup();
        if own.len() != descriptor.names().count() {
            return Err(Error::provider_conflict(descriptor.name, descriptor.name)
                .with_operation("registry::register"));
        }

        let index = self.providers.len();
        for name in own {
            self.names.insert(name, index);
        }
        debug!(provider = descriptor.name, prefix = descriptor.prefix, "registered provider");
        self.providers.push(provider);
        Ok(())
    }

    /// Reject further registrations.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Canonical provider names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Registered providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn provider(&self, name_or_alias: &str) -> Result<Arc<dyn Provider>> {
        self.names
            .get(&name_or_alias.to_ascii_lowercase())
            .map(|&index| self.providers[index].clone())
            .ok_or_else(|| Error::unknown_provider(name_or_alias).with_operation("registry::resolve"))
    }

    /// Resolve a canonical name or alias to its descriptor.
    pub fn resolve(&self, name_or_alias: &str) -> Result<&ProviderDescriptor> {
        self.names
            .get(&name_or_alias.to_ascii_lowercase())
            .map(|&index| self.providers[index].descriptor())
            .ok_or_else(|| Error::unknown_provider(name_or_alias).with_operation("registry::resolve"))
    }

    /// Provider owning `key`: longest matching prefix, earliest registration on ties.
    pub fn classify(&self, key: &str) -> Option<&'static str> {
        let resource_type = resource_type_of(key);
        let mut best: Option<(usize, &Arc<dyn Provider>)> = None;
        for provider in &self.providers {
            let descriptor = provider.descriptor();
            if !descriptor.matches(resource_type) {
                continue;
            }
            let len = descriptor.prefix.len();
            if best.is_none_or(|(best_len, _)| len > best_len) {
                best = Some((len, provider));
            }
        }
        best.map(|(_, provider)| provider.name())
    }

    /// Detect which providers a set of node keys belongs to.
    ///
    /// Never fails: unclassified keys land in the `unknown` bucket and lower
    /// the confidence. Seals the registry.
    pub fn detect<I, S>(&self, keys: I) -> DetectionResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.seal();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut unknown = Vec::new();
        let mut total = 0usize;
        for key in keys {
            let key = key.as_ref();
            total += 1;
            match self.classify(key) {
                Some(name) => *counts.entry(name.to_string()).or_default() += 1,
                None => unknown.push(key.to_string()),
            }
        }

        let providers: BTreeSet<String> = counts.keys().cloned().collect();
        // BTreeMap iterates alphabetically, so the first maximum wins ties.
        let primary = counts
            .iter()
            .fold(None::<(&String, usize)>, |best, (name, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((name, count)),
            })
            .map(|(name, _)| name.clone());
        let classified = total - unknown.len();
        let confidence = if total == 0 {
            1.0
        } else {
            classified as f64 / total as f64
        };
        if !unknown.is_empty() {
            counts.insert(UNKNOWN_PROVIDER.to_string(), unknown.len());
        }

        info!(
            providers = ?providers,
            primary = primary.as_deref().unwrap_or(UNKNOWN_PROVIDER),
            confidence,
            "provider detection"
        );
        DetectionResult {
            providers,
            primary,
            counts,
            confidence,
            unknown,
        }
    }

    /// Detect exactly one provider, failing when zero or several are present.
    pub fn detect_single<I, S>(&self, keys: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let detection = self.detect(keys);
        match detection.providers.len() {
            1 => Ok(detection.providers.into_iter().next().unwrap_or_default()),
            0 => Err(Error::provider_detection("no provider detected")
                .with_operation("registry::detect_single")),
            _ => Err(Error::provider_detection(format!(
                "expected a single provider, found {}",
                detection
                    .providers
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
            .with_operation("registry::detect_single")),
        }
    }

    /// The loaded context for `name`, building it on first use.
    pub fn get_context(&self, name: &str) -> Result<Arc<ProviderContext>> {
        let provider = self.provider(name)?;
        let canonical = provider.name();
        if let Some(cx) = self.contexts.read().get(canonical) {
            return Ok(cx.clone());
        }

        let mut contexts = self.contexts.write();
        if let Some(cx) = contexts.get(canonical) {
            return Ok(cx.clone());
        }
        let cx = Arc::new(
            ProviderContext::load(provider.descriptor())
                .map_err(|err| err.with_operation("registry::get_context"))?,
        );
        info!(provider = canonical, source = cx.source(), "loaded provider configuration");
        contexts.insert(canonical, cx.clone());
        Ok(cx)
    }

    /// Drop the cached context of `name` and build it again from its source.
    pub fn reload_context(&self, name: &str) -> Result<Arc<ProviderContext>> {
        let provider = self.provider(name)?;
        self.contexts.write().remove(provider.name());
        self.get_context(name)
    }

    /// Forget every loaded context. Called at the start of each run.
    pub fn clear_contexts(&self) {
        self.contexts.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerSequence;
    use crate::provider::{Capabilities, ConfigSource};
    use tfgraph_error::ErrorKind;

    const CONFIG: &str =
        "consolidated = []\ndraw_order = []\nvariants = []\nauto_annotations = []\n";

    struct MockProvider {
        descriptor: ProviderDescriptor,
    }

    impl MockProvider {
        fn arc(
            name: &'static str,
            prefix: &'static str,
            aliases: &'static [&'static str],
        ) -> Arc<dyn Provider> {
            Self::with_config(name, prefix, aliases, ConfigSource::Embedded(CONFIG))
        }

        fn with_config(
            name: &'static str,
            prefix: &'static str,
            aliases: &'static [&'static str],
            config: ConfigSource,
        ) -> Arc<dyn Provider> {
            Arc::new(MockProvider {
                descriptor: ProviderDescriptor {
                    name,
                    display_name: name,
                    prefix,
                    config,
                    class_namespace: "mock",
                    icon_namespace: "icons/mock",
                    capabilities: Capabilities::default(),
                    aliases,
                },
            })
        }
    }

    impl Provider for MockProvider {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }

        fn handlers(&self) -> Result<HandlerSequence> {
            HandlerSequence::new(Vec::new())
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(MockProvider::arc("aws", "aws_", &["amazon"])).unwrap();
        registry.register(MockProvider::arc("azure", "azurerm_", &["azurerm"])).unwrap();
        registry.register(MockProvider::arc("gcp", "google_", &["google"])).unwrap();
        registry
    }

    #[test]
    fn test_resolve_by_name_and_alias() {
        let registry = registry();
        assert_eq!(registry.resolve("aws").unwrap().name, "aws");
        assert_eq!(registry.resolve("Google").unwrap().name, "gcp");
        let err = registry.resolve("oracle").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProvider);
    }

    #[test]
    fn test_register_rejects_collisions() {
        let mut registry = registry();
        let err = registry
            .register(MockProvider::arc("amazon", "amzn_", &[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderConflict);
        let err = registry
            .register(MockProvider::arc("oci", "oci_", &["GCP"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderConflict);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_after_detect_is_rejected() {
        let mut registry = registry();
        registry.detect(["aws_instance.a"]);
        let err = registry
            .register(MockProvider::arc("oci", "oci_", &[]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegistrySealed);
    }

    #[test]
    fn test_detect_counts_and_confidence() {
        let registry = registry();
        let detection = registry.detect([
            "aws_instance.a",
            "module.net.aws_vpc.main",
            "azurerm_virtual_network.v",
            "random_pet.name",
        ]);
        assert_eq!(detection.primary.as_deref(), Some("aws"));
        assert_eq!(detection.counts.get("aws"), Some(&2));
        assert_eq!(detection.counts.get("azure"), Some(&1));
        assert_eq!(detection.counts.get(UNKNOWN_PROVIDER), Some(&1));
        assert_eq!(detection.unknown, vec!["random_pet.name".to_string()]);
        assert!((detection.confidence - 0.75).abs() < f64::EPSILON);
        assert!(detection.is_mixed());
    }

    #[test]
    fn test_detect_ties_are_alphabetical_and_deterministic() {
        let registry = registry();
        let keys = ["google_compute_instance.a", "aws_instance.b"];
        for _ in 0..5 {
            let detection = registry.detect(keys);
            assert_eq!(detection.primary.as_deref(), Some("aws"));
            assert_eq!(detection.confidence, 1.0);
        }
    }

    #[test]
    fn test_detect_nothing_falls_back() {
        let registry = registry();
        let detection = registry.detect(["random_id.x", "null_resource.y"]);
        assert!(detection.providers.is_empty());
        assert_eq!(detection.primary, None);
        assert_eq!(detection.primary_or("aws"), "aws");
        assert_eq!(detection.confidence, 0.0);

        let empty = registry.detect(Vec::<String>::new());
        assert_eq!(empty.confidence, 1.0);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut registry = registry();
        registry
            .register(MockProvider::arc("gcp-beta", "google_beta_", &[]))
            .unwrap();
        assert_eq!(registry.classify("google_beta_thing.x"), Some("gcp-beta"));
        assert_eq!(registry.classify("google_compute_instance.x"), Some("gcp"));
    }

    #[test]
    fn test_detect_single() {
        let registry = registry();
        assert_eq!(registry.detect_single(["aws_instance.a"]).unwrap(), "aws");
        let err = registry
            .detect_single(["aws_instance.a", "google_compute_instance.b"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderDetection);
    }

    #[test]
    fn test_context_is_cached() {
        let registry = registry();
        let first = registry.get_context("aws").unwrap();
        let second = registry.get_context("amazon").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let reloaded = registry.reload_context("aws").unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
    }

    #[test]
    fn test_bad_config_is_fatal_on_construction() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(MockProvider::with_config(
                "broken",
                "broken_",
                &[],
                ConfigSource::Embedded("draw_order = []\n"),
            ))
            .unwrap();
        registry
            .register(MockProvider::with_config(
                "absent",
                "absent_",
                &[],
                ConfigSource::File("/nonexistent/tfgraph/absent.toml".into()),
            ))
            .unwrap();
        assert_eq!(
            registry.get_context("broken").unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
        assert_eq!(
            registry.get_context("absent").unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
    }
}
