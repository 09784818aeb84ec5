//! Error types for breach data providers.
//!
//! Providers use these internally; none of them cross the orchestrator
//! boundary. [`ProviderError::into_result`] folds each variant into the
//! uniform [`ProviderResult`] shape.

use breachwatch_core::ProviderResult;
use thiserror::Error;

/// Errors that can occur while resolving or running a provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No provider is registered under this name
    #[error("Unknown provider: {name}")]
    UnknownProvider {
        /// The offending name
        name: String,
    },

    /// Local precondition failed before any I/O
    #[error("{0}")]
    Validation(String),

    /// The provider could not be reached at all
    #[error("{message}")]
    Transport {
        /// Provider name
        provider: String,
        /// Provider-identifying message
        message: String,
    },

    /// The provider answered with an error status
    #[error("{message}")]
    Api {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Human-readable message
        message: String,
        /// `Retry-After` header, verbatim
        retry_after: Option<String>,
    },

    /// The payload could not be decoded
    #[error("{message}")]
    Decode {
        /// Provider name
        provider: String,
        /// HTTP status of the undecodable response
        status: Option<u16>,
        /// Human-readable message
        message: String,
    },

    /// The provider did not finish within its deadline
    #[error("{provider} provider timed out after {seconds}s")]
    Timeout {
        /// Provider name
        provider: String,
        /// Deadline in seconds
        seconds: u64,
    },

    /// Anything else (construction failure, panic)
    #[error("internal error ({provider}): {message}")]
    Internal {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl ProviderError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Decode { status, .. } => *status,
            _ => None,
        }
    }

    /// Retry hint carried by the error, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::Api { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    /// Whether the provider reported that the subject has no records.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Convert into a failed result for `provider`.
    #[must_use]
    pub fn into_result(self, provider: &str) -> ProviderResult {
        let status_code = self.status_code();
        let retry_after = self.retry_after().map(ToString::to_string);
        ProviderResult::failure(provider, self.to_string())
            .with_status_code(status_code)
            .with_retry_after(retry_after)
    }
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
