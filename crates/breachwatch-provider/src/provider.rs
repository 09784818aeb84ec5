//! Core breach provider trait.

use crate::error::Result;
use async_trait::async_trait;
use breachwatch_core::{ProviderResult, SearchRequest};

/// Trait for breach data providers.
///
/// All backends must implement this trait. Implementations should be
/// thread-safe (Send + Sync) so the orchestrator can run them concurrently.
#[async_trait]
pub trait BreachProvider: Send + Sync {
    /// Registry name of this provider (lower-case).
    fn name(&self) -> &str;

    /// Check local preconditions (credentials, identity, option types).
    ///
    /// Must not perform network I/O.
    ///
    /// # Errors
    /// Returns a validation error describing the first failed precondition.
    fn validate(&self, request: &SearchRequest) -> Result<()>;

    /// Run the provider protocol for `request`.
    ///
    /// Implementations validate first and report every failure, including
    /// validation, through the returned [`ProviderResult`].
    async fn search(&self, request: &SearchRequest) -> ProviderResult;
}
