//! Breachwatch Core - Foundation crate for breach lookups.
//!
//! This crate provides the value types every other breachwatch crate passes
//! around, plus error handling and configuration management.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Request, response, credential and finding types
//!
//! # Example
//!
//! ```rust
//! use breachwatch_core::{ProviderCredentials, SearchRequest};
//!
//! let request = SearchRequest::for_email("user@example.com")
//!     .with_providers(["HaveIBeenPwned", "dehashed"])
//!     .with_criterion("haveibeenpwned", "include_pastes", true)
//!     .with_credentials(
//!         "haveibeenpwned",
//!         ProviderCredentials::new().with_api_key("my-key"),
//!     );
//!
//! assert_eq!(request.providers(), &["haveibeenpwned", "dehashed"]);
//! assert!(request.criteria("dehashed").is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, DehashedConfig, HibpConfig, SearchConfig, DEFAULT_DEHASHED_BASE_URL,
    DEFAULT_DEHASHED_PAGE_SIZE, DEFAULT_HIBP_BASE_URL, DEFAULT_HIBP_QUERIES_PER_SECOND,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{
    category, criteria_flag, criteria_text, is_truthy, normalize_provider_name, value_label,
    ApiKey, Criteria, Finding, ProviderCredentials, ProviderResult, SearchRequest,
    SearchResponse,
};

/// User agent sent when neither credentials nor configuration provide one.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "breachwatch/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/breachwatch/breachwatch)"
);
