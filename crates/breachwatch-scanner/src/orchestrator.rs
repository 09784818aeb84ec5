//! Search orchestrator for fanning a request out to breach providers.
//!
//! This module provides the `ScanOrchestrator` which resolves every requested
//! provider through the registry, runs them concurrently, and folds every
//! outcome (including unknown names, construction failures, panics and
//! deadline expiry) into one uniform [`SearchResponse`].

use breachwatch_core::{
    normalize_provider_name, ProviderResult, SearchConfig, SearchRequest, SearchResponse,
};
use breachwatch_provider::{ProviderError, ProviderRegistry};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Providers queried when a request names none.
pub const DEFAULT_PROVIDERS: [&str; 1] = ["haveibeenpwned"];

/// Default number of providers running at once.
pub const DEFAULT_MAX_CONCURRENT_PROVIDERS: usize = 4;

/// Orchestrates searches across multiple providers.
pub struct ScanOrchestrator {
    /// Registry used to resolve provider names
    registry: Arc<ProviderRegistry>,
    /// Providers used when the request names none
    default_providers: Vec<String>,
    /// Maximum concurrent provider calls
    max_concurrent_providers: usize,
    /// Optional wall-clock limit per provider call
    provider_deadline: Option<Duration>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            default_providers: DEFAULT_PROVIDERS.iter().map(ToString::to_string).collect(),
            max_concurrent_providers: DEFAULT_MAX_CONCURRENT_PROVIDERS,
            provider_deadline: None,
        }
    }

    /// Create an orchestrator configured from the `[search]` section.
    #[must_use]
    pub fn from_config(registry: Arc<ProviderRegistry>, config: &SearchConfig) -> Self {
        let orchestrator = Self::new(registry)
            .with_default_providers(&config.default_providers)
            .with_max_concurrent_providers(config.max_concurrent_providers);

        match config.provider_deadline() {
            Some(deadline) => orchestrator.with_provider_deadline(deadline),
            None => orchestrator,
        }
    }

    /// Set the providers used when a request names none.
    ///
    /// An empty list keeps the current defaults.
    #[must_use]
    pub fn with_default_providers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut defaults: Vec<String> = Vec::new();
        for name in names {
            let name = normalize_provider_name(name.as_ref());
            if !name.is_empty() && !defaults.contains(&name) {
                defaults.push(name);
            }
        }
        if !defaults.is_empty() {
            self.default_providers = defaults;
        }
        self
    }

    /// Set the maximum number of providers running at once (at least 1).
    #[must_use]
    pub fn with_max_concurrent_providers(mut self, max: usize) -> Self {
        self.max_concurrent_providers = max.max(1);
        self
    }

    /// Bound every provider call by `deadline`.
    #[must_use]
    pub fn with_provider_deadline(mut self, deadline: Duration) -> Self {
        self.provider_deadline = Some(deadline);
        self
    }

    /// Providers used when a request names none.
    #[must_use]
    pub fn default_providers(&self) -> &[String] {
        &self.default_providers
    }

    /// Run `request` against every requested provider.
    ///
    /// Never fails: each provider's outcome, good or bad, becomes one entry
    /// of the response. Duplicate names are dispatched once.
    pub async fn search(&self, request: &SearchRequest) -> SearchResponse {
        let requested = request.distinct_providers();
        let names: Vec<&str> = if requested.is_empty() {
            self.default_providers.iter().map(String::as_str).collect()
        } else {
            requested
        };

        tracing::info!(
            "Dispatching search to {} provider(s): {}",
            names.len(),
            names.join(", ")
        );

        let mut futures = FuturesUnordered::new();
        let mut response = SearchResponse::new();

        for name in names {
            futures.push(self.run_provider(name, request));

            // Respect concurrency limit
            while futures.len() >= self.max_concurrent_providers {
                if let Some((name, result)) = futures.next().await {
                    response.insert(name, result);
                }
            }
        }

        // Collect remaining results
        while let Some((name, result)) = futures.next().await {
            response.insert(name, result);
        }

        response
    }

    /// Resolve, build and run a single provider, isolating every failure.
    async fn run_provider<'a>(
        &self,
        name: &'a str,
        request: &SearchRequest,
    ) -> (&'a str, ProviderResult) {
        let call = async {
            let provider = self.registry.create(name)?;
            Ok::<_, ProviderError>(provider.search(request).await)
        };
        let call = AssertUnwindSafe(call).catch_unwind();

        let outcome = match self.provider_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(Err(ProviderError::Timeout {
                    provider: name.to_string(),
                    seconds: whole_seconds(deadline),
                })),
            },
            None => call.await,
        };

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!("Provider {} failed before producing a result: {}", name, e);
                e.into_result(name)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("Provider {} panicked: {}", name, message);
                ProviderError::Internal {
                    provider: name.to_string(),
                    message,
                }
                .into_result(name)
            }
        };

        if result.ok {
            tracing::info!("Provider {} returned {} finding(s)", name, result.finding_count());
        } else {
            tracing::warn!(
                "Provider {} reported an error: {}",
                name,
                result.error.as_deref().unwrap_or_default()
            );
        }

        (name, result)
    }
}

/// Deadline in whole seconds, rounded up.
fn whole_seconds(deadline: Duration) -> u64 {
    deadline.as_secs() + u64::from(deadline.subsec_nanos() > 0)
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "provider panicked".to_string()
    }
}
