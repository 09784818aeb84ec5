//! Name to constructor mapping for breach providers.

use crate::error::{ProviderError, Result};
use crate::provider::BreachProvider;
use crate::providers::{DehashedProvider, HibpProvider};
use breachwatch_core::{normalize_provider_name, AppConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Constructor for a provider instance.
///
/// A fresh instance is built for every search so no state leaks between
/// invocations.
pub type ProviderFactory = Arc<dyn Fn() -> Result<Box<dyn BreachProvider>> + Send + Sync>;

/// Registry of provider constructors, keyed by lower-case name.
///
/// Registration takes `&mut self`, so all providers are registered before
/// the registry is shared with an orchestrator.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in providers, using default settings.
    #[must_use]
    pub fn with_defaults(client: reqwest::Client) -> Self {
        Self::from_config(client, &AppConfig::default())
    }

    /// Create a registry with the built-in providers configured from `config`.
    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &AppConfig) -> Self {
        let mut registry = Self::new();

        let hibp_client = client.clone();
        let search = config.search.clone();
        let hibp = config.haveibeenpwned.clone();
        registry.register(crate::providers::haveibeenpwned::NAME, move || {
            Ok(Box::new(
                HibpProvider::new(hibp_client.clone())
                    .with_base_url(hibp.base_url.clone())
                    .with_default_queries_per_second(hibp.queries_per_second)
                    .with_default_timeout(search.timeout())
                    .with_default_user_agent(search.user_agent.clone()),
            ) as Box<dyn BreachProvider>)
        });

        let search = config.search.clone();
        let dehashed = config.dehashed.clone();
        registry.register(crate::providers::dehashed::NAME, move || {
            Ok(Box::new(
                DehashedProvider::new(client.clone())
                    .with_base_url(dehashed.base_url.clone())
                    .with_default_page_size(dehashed.page_size)
                    .with_default_timeout(search.timeout())
                    .with_default_user_agent(search.user_agent.clone()),
            ) as Box<dyn BreachProvider>)
        });

        registry
    }

    /// Add or replace a provider constructor.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn BreachProvider>> + Send + Sync + 'static,
    {
        let name = normalize_provider_name(name);
        debug!(provider = %name, "registered provider");
        self.factories.insert(name, Arc::new(factory));
    }

    /// Look up the constructor for `name`.
    ///
    /// # Errors
    /// Returns [`ProviderError::UnknownProvider`] if nothing is registered.
    pub fn resolve(&self, name: &str) -> Result<ProviderFactory> {
        self.factories
            .get(&normalize_provider_name(name))
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider {
                name: name.to_string(),
            })
    }

    /// Resolve `name` and build a fresh instance.
    pub fn create(&self, name: &str) -> Result<Box<dyn BreachProvider>> {
        let factory = self.resolve(name)?;
        factory()
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Check if a provider is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&normalize_provider_name(name))
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use breachwatch_core::{ProviderResult, SearchRequest};

    struct StaticProvider;

    #[async_trait]
    impl BreachProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn validate(&self, _request: &SearchRequest) -> Result<()> {
            Ok(())
        }

        async fn search(&self, _request: &SearchRequest) -> ProviderResult {
            ProviderResult::success("static", Vec::new())
        }
    }

    #[test]
    fn test_defaults_registered() {
        let registry = ProviderRegistry::with_defaults(reqwest::Client::new());
        assert_eq!(registry.list(), vec!["dehashed", "haveibeenpwned"]);
        assert!(registry.contains("HaveIBeenPwned"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_config_defaults_match_provider_defaults() {
        use crate::providers::{dehashed, haveibeenpwned};

        let config = breachwatch_core::AppConfig::default();
        assert_eq!(config.haveibeenpwned.base_url, haveibeenpwned::DEFAULT_BASE_URL);
        assert!(
            (config.haveibeenpwned.queries_per_second
                - haveibeenpwned::DEFAULT_QUERIES_PER_SECOND)
                .abs()
                < f64::EPSILON
        );
        assert_eq!(config.dehashed.base_url, dehashed::DEFAULT_BASE_URL);
        assert_eq!(config.dehashed.page_size, dehashed::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_register_normalizes_and_overwrites() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        registry.register("  Static ", || {
            Ok(Box::new(StaticProvider) as Box<dyn BreachProvider>)
        });
        registry.register("static", || {
            Ok(Box::new(StaticProvider) as Box<dyn BreachProvider>)
        });

        assert_eq!(registry.list(), vec!["static"]);
        let provider = registry.create("STATIC").expect("create provider");
        assert_eq!(provider.name(), "static");
    }

    #[test]
    fn test_resolve_unknown_provider() {
        let registry = ProviderRegistry::new();
        let err = registry.resolve("Missing").err().expect("unknown provider");
        assert!(matches!(err, ProviderError::UnknownProvider { ref name } if name == "Missing"));
        assert_eq!(err.to_string(), "Unknown provider: Missing");
    }

    #[test]
    fn test_list_is_sorted() {
        let mut registry = ProviderRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(name, || {
                Ok(Box::new(StaticProvider) as Box<dyn BreachProvider>)
            });
        }
        assert_eq!(registry.list(), vec!["alpha", "mid", "zeta"]);
    }
}
